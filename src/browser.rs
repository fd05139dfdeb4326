//! Browser sidecar interface
//!
//! The browser-automation layer lives outside this process: a sidecar
//! service drives a real browser, loads reservation and login pages, and
//! reports back both the rendered page data and the outgoing requests it
//! observed, headers included. This module defines the [`BrowserSession`]
//! seam the monitors depend on and an HTTP client for the sidecar's API.
//!
//! The sidecar must distinguish an HTTP 429 login response carrying the
//! provider's invalid-credentials code from other failures; that surfaces
//! here as [`ApiError::InvalidCredentials`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::{Account, Reservation, UpcomingTrip};
use crate::utils::error::ApiError;

/// One outgoing request observed by the browser while loading a page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedRequest {
    pub url: String,
    /// Header name/value pairs in capture order
    pub headers: Vec<(String, String)>,
}

/// Result of loading a reservation page through the browser
#[derive(Debug, Clone, Deserialize)]
pub struct PageCapture {
    /// Parsed page data (the view-reservation JSON)
    pub data: serde_json::Value,
    /// Outgoing requests observed during the load
    pub requests: Vec<CapturedRequest>,
}

/// Result of a login flow through the browser
#[derive(Debug, Clone, Deserialize)]
pub struct LoginCapture {
    pub first_name: String,
    pub last_name: String,
    pub trips: Vec<UpcomingTrip>,
    pub requests: Vec<CapturedRequest>,
}

/// The browser-driven layer consumed by the monitors
///
/// Implementations load pages with genuine browser traffic and report the
/// captured requests so the monitor can refresh its trust headers.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Load the view-reservation page for one reservation
    async fn load_reservation(&self, reservation: &Reservation) -> Result<PageCapture, ApiError>;

    /// Log in and fetch the account's upcoming-trips listing
    async fn login(&self, account: &Account) -> Result<LoginCapture, ApiError>;
}

/// Configuration for the sidecar client
#[derive(Debug, Clone)]
pub struct SidecarConfig {
    /// Sidecar base URL
    pub endpoint: String,

    /// Request timeout; page loads through a real browser are slow
    pub timeout: Duration,
}

impl SidecarConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct LoadRequest<'a> {
    confirmation_number: &'a str,
    first_name: &'a str,
    last_name: &'a str,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Sidecar error body for failed loads/logins
#[derive(Deserialize)]
struct SidecarError {
    kind: String,
    #[serde(default)]
    message: String,
}

/// HTTP client for the browser sidecar service
pub struct RemoteBrowserSession {
    config: SidecarConfig,
    client: Client,
}

impl RemoteBrowserSession {
    pub fn new(config: SidecarConfig) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.endpoint.trim_end_matches('/'))
    }

    /// Map a non-success sidecar response onto the API error taxonomy
    async fn map_failure(response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let body = response.bytes().await.unwrap_or_default();

        if let Ok(err) = serde_json::from_slice::<SidecarError>(&body) {
            return match err.kind.as_str() {
                "invalid_credentials" => ApiError::InvalidCredentials,
                "rate_limited" => ApiError::RateLimited,
                _ => ApiError::MalformedResponse(err.message),
            };
        }

        ApiError::Status(status)
    }
}

#[async_trait]
impl BrowserSession for RemoteBrowserSession {
    async fn load_reservation(&self, reservation: &Reservation) -> Result<PageCapture, ApiError> {
        let response = self
            .client
            .post(self.url("load-reservation"))
            .json(&LoadRequest {
                confirmation_number: &reservation.confirmation_number,
                first_name: &reservation.first_name,
                last_name: &reservation.last_name,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::map_failure(response).await);
        }

        response
            .json::<PageCapture>()
            .await
            .map_err(|e| ApiError::MalformedResponse(format!("sidecar load response: {e}")))
    }

    async fn login(&self, account: &Account) -> Result<LoginCapture, ApiError> {
        let response = self
            .client
            .post(self.url("login"))
            .json(&LoginRequest {
                username: &account.username,
                password: &account.password,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::map_failure(response).await);
        }

        response
            .json::<LoginCapture>()
            .await
            .map_err(|e| ApiError::MalformedResponse(format!("sidecar login response: {e}")))
    }
}
