//! Shared fixtures for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::MockServer;

use jetway::browser::{BrowserSession, CapturedRequest, LoginCapture, PageCapture};
use jetway::client::ReservationClient;
use jetway::error::ApiError;
use jetway::fare::FareChecker;
use jetway::headers::HeaderStore;
use jetway::models::{Account, Flight, Reservation};
use jetway::notifications::{
    Channel, ChannelError, DeliveryStatus, Notification, NotificationHandler,
};
use jetway::scheduler::{CheckInPolicy, CheckInScheduler};
use jetway::utils::retry::RetryConfig;

/// Browser session that replays scripted captures in order
#[derive(Default)]
pub struct ScriptedSession {
    pub loads: Mutex<VecDeque<Result<PageCapture, ApiError>>>,
    pub logins: Mutex<VecDeque<Result<LoginCapture, ApiError>>>,
}

impl ScriptedSession {
    pub fn push_load(&self, capture: Result<PageCapture, ApiError>) {
        self.loads.lock().unwrap().push_back(capture);
    }

    pub fn push_login(&self, capture: Result<LoginCapture, ApiError>) {
        self.logins.lock().unwrap().push_back(capture);
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn load_reservation(
        &self,
        _reservation: &Reservation,
    ) -> Result<PageCapture, ApiError> {
        self.loads
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ApiError::Timeout))
    }

    async fn login(&self, _account: &Account) -> Result<LoginCapture, ApiError> {
        self.logins
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ApiError::Timeout))
    }
}

/// Notification channel that records every event kind it receives
pub struct RecordingChannel {
    pub seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, notification: &Notification) -> Result<DeliveryStatus, ChannelError> {
        self.seen
            .lock()
            .unwrap()
            .push(notification.kind().to_string());
        Ok(DeliveryStatus::success("recording"))
    }
}

/// Fare checker that counts invocations
#[derive(Default)]
pub struct CountingFareChecker {
    pub calls: AtomicUsize,
}

#[async_trait]
impl FareChecker for CountingFareChecker {
    async fn check_flight_price(&self, _flight: &Flight) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// The full header set a browser capture carries, whitelisted and not
pub fn captured_request() -> CapturedRequest {
    CapturedRequest {
        url: "https://mobile.example.com/api/".to_string(),
        headers: [
            ("Host", "test_host"),
            ("User-Agent", "test_agent"),
            ("Accept", "test_accept"),
            ("X-API-Key", "test_key"),
            ("X-Channel-ID", "test_channel_id"),
            ("X-User-Experience-ID", "test_ux_id"),
            ("EE30zvQLWf-f", "test_f"),
            ("EE30zvQLWf-b", "test_b"),
            ("Cookie", "test_cookie"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect(),
    }
}

/// A one-bound view-reservation page for a departure airport
pub fn reservation_page(airport: &str, status: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "viewReservationViewPage": {
            "bounds": [bound(airport, status)],
        }
    })
}

/// A two-bound view-reservation page
pub fn round_trip_page(status: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "viewReservationViewPage": {
            "bounds": [bound("LAX", status), bound("SYD", status)],
        }
    })
}

fn bound(airport: &str, status: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "arrivalAirport": {"name": "test_inbound"},
        "arrivalTime": "21:40",
        "departureAirport": {"code": airport, "name": "test_outbound"},
        "departureDate": "2020-10-13",
        "departureStatus": status,
        "departureTime": "14:40",
    })
}

/// Scheduler wired to a mock API server, with instant worker retries
pub fn scheduler_for(
    server: &MockServer,
    notifier: Arc<NotificationHandler>,
    fare: Arc<CountingFareChecker>,
) -> CheckInScheduler {
    let store = HeaderStore::new();
    let client = Arc::new(
        ReservationClient::with_config(
            store.clone(),
            100,
            Duration::from_secs(5),
            RetryConfig::new(0),
        )
        .unwrap()
        .with_base_url(&server.uri()),
    );

    CheckInScheduler::new(
        store,
        client,
        notifier,
        fare,
        CheckInPolicy {
            checkin_opens: chrono::Duration::hours(24),
            max_attempts: 2,
            retry_wait: Duration::ZERO,
        },
    )
}
