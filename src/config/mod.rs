//! Configuration loading and validation
//!
//! Settings come from a TOML file, with a handful of environment variable
//! overrides (`JETWAY_*`) on top. Every section has working defaults; the
//! only thing a user must supply is something to monitor, either
//! reservations or accounts.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::{Account, AirportTimezones, Reservation};
use crate::scheduler::CheckInPolicy;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub monitor: MonitorConfig,
    pub checkin: CheckinConfig,
    pub api: ApiConfig,
    pub browser: BrowserConfig,
    pub notifications: NotificationsConfig,
    pub logging: LoggingConfig,

    /// Reservations monitored by confirmation number
    pub reservations: Vec<ReservationEntry>,
    /// Accounts whose trip lists are monitored
    pub accounts: Vec<AccountEntry>,
}

/// Polling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between polling cycles
    pub poll_interval_secs: u64,
    /// Optional JSON file of airport-code to IANA-zone pairs
    pub timezone_data: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 3600,
            timezone_data: None,
        }
    }
}

/// Check-in worker timing and retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckinConfig {
    /// Hours before departure when the check-in window opens
    pub opens_offset_hours: i64,
    /// Attempts per flight, counting the first
    pub max_attempts: u32,
    /// Seconds between attempts
    pub retry_wait_secs: u64,
}

impl Default for CheckinConfig {
    fn default() -> Self {
        Self {
            opens_offset_hours: 24,
            max_attempts: 4,
            retry_wait_secs: 30,
        }
    }
}

/// Direct API client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub request_timeout_secs: u64,
    pub requests_per_second: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            requests_per_second: 2,
        }
    }
}

/// Browser sidecar settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Base URL of the browser sidecar service
    pub endpoint: String,
    /// Sidecar request timeout; real page loads are slow
    pub timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:4040".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Notification settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Webhook URLs that receive every lifecycle event
    pub webhook_urls: Vec<String>,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Output format: "text" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// One monitored reservation as written in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationEntry {
    pub confirmation_number: String,
    pub first_name: String,
    pub last_name: String,
}

/// One monitored account as written in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountEntry {
    pub username: String,
    pub password: String,
}

impl Config {
    /// Load configuration from a TOML file, then apply environment
    /// overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))
    }

    /// Apply `JETWAY_*` environment variable overrides
    pub fn apply_env(&mut self) {
        if let Ok(value) = std::env::var("JETWAY_POLL_INTERVAL_SECS") {
            if let Ok(secs) = value.parse() {
                self.monitor.poll_interval_secs = secs;
            }
        }
        if let Ok(value) = std::env::var("JETWAY_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Ok(value) = std::env::var("JETWAY_LOG_FORMAT") {
            self.logging.format = value;
        }
        if let Ok(value) = std::env::var("JETWAY_BROWSER_ENDPOINT") {
            self.browser.endpoint = value;
        }
        if let Ok(value) = std::env::var("JETWAY_WEBHOOK_URL") {
            self.notifications.webhook_urls.push(value);
        }
    }

    /// Check the configuration for contradictions
    pub fn validate(&self) -> Result<()> {
        if self.monitor.poll_interval_secs == 0 {
            return Err(Error::config("monitor.poll_interval_secs must be greater than 0"));
        }
        if self.checkin.max_attempts == 0 {
            return Err(Error::config("checkin.max_attempts must be greater than 0"));
        }
        if self.checkin.opens_offset_hours <= 0 {
            return Err(Error::config("checkin.opens_offset_hours must be positive"));
        }
        if self.api.requests_per_second == 0 {
            return Err(Error::config("api.requests_per_second must be greater than 0"));
        }
        if self.reservations.is_empty() && self.accounts.is_empty() {
            return Err(Error::config(
                "nothing to monitor: add at least one reservation or account",
            ));
        }
        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(Error::config("logging.format must be \"text\" or \"json\""));
        }

        for entry in &self.reservations {
            if entry.confirmation_number.is_empty() {
                return Err(Error::config("reservation with empty confirmation number"));
            }
        }
        for url in &self.notifications.webhook_urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(Error::config(format!("invalid webhook URL: {url}")));
            }
        }

        Ok(())
    }

    /// Polling interval as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.monitor.poll_interval_secs)
    }

    /// Worker policy derived from the check-in section
    pub fn checkin_policy(&self) -> CheckInPolicy {
        CheckInPolicy {
            checkin_opens: chrono::Duration::hours(self.checkin.opens_offset_hours),
            max_attempts: self.checkin.max_attempts,
            retry_wait: Duration::from_secs(self.checkin.retry_wait_secs),
        }
    }

    /// Monitored reservations as domain values
    pub fn reservations(&self) -> Vec<Reservation> {
        self.reservations
            .iter()
            .map(|e| Reservation::new(&e.confirmation_number, &e.first_name, &e.last_name))
            .collect()
    }

    /// Monitored accounts as domain values
    pub fn accounts(&self) -> Vec<Account> {
        self.accounts
            .iter()
            .map(|e| Account {
                username: e.username.clone(),
                password: e.password.clone(),
            })
            .collect()
    }

    /// Load the airport timezone table, empty when not configured
    pub fn timezones(&self) -> Result<AirportTimezones> {
        match &self.monitor.timezone_data {
            Some(path) => AirportTimezones::from_file(path).map_err(Error::from),
            None => Ok(AirportTimezones::new()),
        }
    }
}
