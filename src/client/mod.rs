//! Direct reservation API client
//!
//! Thin request layer over the provider's mobile API. Every call replays
//! the current [`HeaderStore`] snapshot so the traffic looks like a
//! continuation of the captured browser session. Transient server errors
//! are retried with backoff; an HTTP 429 is split into the
//! invalid-credentials condition (stale headers, wait for a fresh capture)
//! and plain provider throttling.

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::headers::HeaderStore;
use crate::models::{AirportTimezones, Flight, Reservation, ViewReservationResponse};
use crate::utils::error::ApiError;
use crate::utils::retry::{with_retry_if, RetryConfig};

/// Provider API base
pub const BASE_URL: &str = "https://mobile.southwest.com/api/";

/// View-reservation endpoint, confirmation number appended
pub const VIEW_RESERVATION_URL: &str =
    "mobile-air-booking/v1/mobile-air-booking/page/view-reservation/";

/// Check-in page endpoint, confirmation number appended
pub const CHECKIN_URL: &str = "mobile-air-operations/v1/mobile-air-operations/page/check-in/";

/// Application code embedded in 429 bodies when the captured headers have
/// expired
pub const INVALID_CREDENTIALS_CODE: u64 = 400518024;

/// Client for the reservation-lookup and check-in endpoints
pub struct ReservationClient {
    client: Client,

    /// Shared trust-header state, refreshed by the monitor
    header_store: Arc<HeaderStore>,

    /// Rate limiter to keep direct calls under the provider's radar
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    /// Retry policy for transient server errors
    retry: RetryConfig,

    /// Base URL, overridable for tests with a mock server
    base_url: String,
}

impl ReservationClient {
    /// Create a new client with default settings
    pub fn new(header_store: Arc<HeaderStore>) -> Result<Self, ApiError> {
        Self::with_config(header_store, 2, Duration::from_secs(30), RetryConfig::default())
    }

    /// Create a new client with custom rate limit, timeout and retry policy
    pub fn with_config(
        header_store: Arc<HeaderStore>,
        requests_per_second: u32,
        timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).gzip(true).build()?;

        let rate = NonZeroU32::new(requests_per_second)
            .unwrap_or_else(|| NonZeroU32::new(1).expect("1 is non-zero"));
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        Ok(Self {
            client,
            header_store,
            rate_limiter,
            retry,
            base_url: BASE_URL.to_string(),
        })
    }

    /// Override the base URL, for tests against a mock server
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = format!("{}/", base_url.trim_end_matches('/'));
        self
    }

    /// Look up the current flights of a reservation
    ///
    /// Bounds with a terminal departure status are kept in the result; the
    /// scheduler uses them to tear down stale workers.
    pub async fn view_reservation(
        &self,
        reservation: &Reservation,
        timezones: &AirportTimezones,
    ) -> Result<Vec<Flight>, ApiError> {
        let path = format!("{VIEW_RESERVATION_URL}{}", reservation.confirmation_number);
        let value = self
            .request(
                Method::GET,
                &path,
                &[
                    ("first-name", reservation.first_name.as_str()),
                    ("last-name", reservation.last_name.as_str()),
                ],
                None,
            )
            .await?;

        let response: ViewReservationResponse = serde_json::from_value(value)
            .map_err(|e| ApiError::MalformedResponse(format!("view-reservation: {e}")))?;

        response
            .page
            .bounds
            .iter()
            .map(|bound| Flight::from_bound(bound, reservation, timezones))
            .collect()
    }

    /// Perform the two-step check-in for one flight
    ///
    /// A GET of the check-in page yields a link object with the POST target
    /// and its body; the POST completes the check-in.
    pub async fn check_in(&self, flight: &Flight) -> Result<Value, ApiError> {
        let reservation = &flight.reservation;
        let path = format!("{CHECKIN_URL}{}", reservation.confirmation_number);
        let page = self
            .request(
                Method::GET,
                &path,
                &[
                    ("first-name", reservation.first_name.as_str()),
                    ("last-name", reservation.last_name.as_str()),
                ],
                None,
            )
            .await?;

        let link = page
            .pointer("/checkInViewReservationPage/_links/checkIn")
            .ok_or_else(|| {
                ApiError::MalformedResponse("check-in page without checkIn link".to_string())
            })?;
        let href = link
            .get("href")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::MalformedResponse("checkIn link without href".to_string()))?;
        let body = link.get("body").cloned().unwrap_or(Value::Null);

        let post_path = href.trim_start_matches('/').to_string();
        self.request(Method::POST, &post_path, &[], Some(body)).await
    }

    /// Issue one API request with rate limiting and transient-error retry
    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{path}", self.base_url);

        with_retry_if(
            &self.retry,
            || self.send_once(method.clone(), &url, query, body.as_ref()),
            Self::should_retry,
        )
        .await
    }

    /// Retry transient server errors only; the 429 taxonomy and client
    /// errors surface to the caller immediately
    fn should_retry(error: &ApiError) -> bool {
        matches!(error, ApiError::Timeout)
            || matches!(error, ApiError::Status(status) if *status >= 500)
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        self.rate_limiter.until_ready().await;

        let headers = self.header_store.snapshot().await;
        let mut request = self.client.request(method, url).headers(headers);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout
            } else {
                ApiError::Http(e)
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Self::classify_429(&response.bytes().await.unwrap_or_default()));
        }
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ApiError::MalformedResponse(format!("invalid JSON body: {e}")))
    }

    /// Split a 429 into stale-headers versus throttling by the embedded
    /// application code
    fn classify_429(body: &[u8]) -> ApiError {
        let code = serde_json::from_slice::<Value>(body)
            .ok()
            .and_then(|v| v.get("code").and_then(Value::as_u64));

        match code {
            Some(INVALID_CREDENTIALS_CODE) => ApiError::InvalidCredentials,
            _ => ApiError::RateLimited,
        }
    }
}
