//! Lifecycle notifications
//!
//! Every user-visible outcome of the monitor flows through here: newly
//! scheduled flights, each worker's terminal state, and login problems.
//! The [`NotificationHandler`] fans an event out to every registered
//! channel; delivery failures are logged and never propagate into the
//! monitor loop or a worker.

pub mod channels;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Flight;

pub use channels::webhook::{WebhookChannel, WebhookConfig};
pub use channels::{Channel, ChannelError, DeliveryStatus};

/// Flight fields carried in notification payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightSummary {
    pub confirmation_number: String,
    pub traveler: String,
    pub departure_airport: String,
    pub destination: String,
    pub departs_at: DateTime<Utc>,
}

impl From<&Flight> for FlightSummary {
    fn from(flight: &Flight) -> Self {
        Self {
            confirmation_number: flight.reservation.confirmation_number.clone(),
            traveler: flight.reservation.traveler(),
            departure_airport: flight.departure_airport_code.clone(),
            destination: flight.arrival_airport_name.clone(),
            departs_at: flight.departure_utc,
        }
    }
}

/// A lifecycle event worth telling the user about
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    /// The scheduler started tracking flights it had not seen before
    NewFlights { flights: Vec<FlightSummary> },
    /// A worker checked its flight in
    CheckinSuccess { flight: FlightSummary },
    /// A worker exhausted its retry budget
    CheckinFailure { flight: FlightSummary, reason: String },
    /// An account login was rejected
    LoginError { username: String, reason: String },
}

impl Notification {
    /// Event kind as it appears in payloads and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NewFlights { .. } => "new_flights",
            Self::CheckinSuccess { .. } => "checkin_success",
            Self::CheckinFailure { .. } => "checkin_failure",
            Self::LoginError { .. } => "login_error",
        }
    }

    /// Human-readable message
    pub fn message(&self) -> String {
        match self {
            Self::NewFlights { flights } => {
                let list: Vec<String> = flights
                    .iter()
                    .map(|f| format!("{} -> {}", f.departure_airport, f.destination))
                    .collect();
                format!("Scheduled check-in for {} flight(s): {}", flights.len(), list.join(", "))
            }
            Self::CheckinSuccess { flight } => format!(
                "Checked {} in for {} -> {}",
                flight.traveler, flight.departure_airport, flight.destination
            ),
            Self::CheckinFailure { flight, reason } => format!(
                "Failed to check {} in for {} -> {}: {reason}",
                flight.traveler, flight.departure_airport, flight.destination
            ),
            Self::LoginError { username, reason } => {
                format!("Login failed for {username}: {reason}")
            }
        }
    }
}

/// Fans notifications out to the registered channels
#[derive(Default)]
pub struct NotificationHandler {
    channels: Vec<Box<dyn Channel + Send + Sync>>,
}

impl NotificationHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a notification channel
    pub fn add_channel(&mut self, channel: Box<dyn Channel + Send + Sync>) {
        self.channels.push(channel);
    }

    /// Register a webhook channel by URL
    pub fn add_webhook(&mut self, url: &str) -> Result<(), ChannelError> {
        let channel = WebhookChannel::from_url(url)?;
        self.add_channel(Box::new(channel));
        Ok(())
    }

    /// Deliver one notification to every channel
    ///
    /// Failures are logged per channel; the event is never re-raised to
    /// the caller.
    pub async fn publish(&self, notification: Notification) {
        tracing::info!(event = notification.kind(), "{}", notification.message());

        for channel in &self.channels {
            match channel.send(&notification).await {
                Ok(status) if !status.success => {
                    tracing::error!(channel = channel.name(), "Notification delivery failed: {status}");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(channel = channel.name(), error = %e, "Notification channel error");
                }
            }
        }
    }

    /// Announce newly scheduled flights
    pub async fn new_flights(&self, flights: &[Flight]) {
        if flights.is_empty() {
            return;
        }
        self.publish(Notification::NewFlights {
            flights: flights.iter().map(FlightSummary::from).collect(),
        })
        .await;
    }

    /// Announce a successful check-in
    pub async fn checkin_success(&self, flight: &Flight) {
        self.publish(Notification::CheckinSuccess {
            flight: FlightSummary::from(flight),
        })
        .await;
    }

    /// Announce an exhausted worker
    pub async fn checkin_failure(&self, flight: &Flight, reason: impl Into<String>) {
        self.publish(Notification::CheckinFailure {
            flight: FlightSummary::from(flight),
            reason: reason.into(),
        })
        .await;
    }

    /// Announce a rejected login
    pub async fn login_error(&self, username: &str, reason: impl Into<String>) {
        self.publish(Notification::LoginError {
            username: username.to_string(),
            reason: reason.into(),
        })
        .await;
    }
}
