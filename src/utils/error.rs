//! Error types for the reservation API layer
//!
//! This module defines the errors surfaced by direct calls against the
//! reservation provider and by the browser sidecar.

use thiserror::Error;

/// Errors that can occur while talking to the reservation API
#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Captured headers are no longer accepted by the provider
    ///
    /// Raised for HTTP 429 responses carrying the provider's
    /// invalid-credentials application code. Recoverable once the monitor
    /// captures a fresh header set.
    #[error("Captured headers rejected, a fresh capture is required")]
    InvalidCredentials,

    /// Provider throttling (HTTP 429 without the invalid-credentials code)
    #[error("Rate limited by the provider")]
    RateLimited,

    /// Non-success status code outside the 429 taxonomy
    #[error("Server returned status {0}")]
    Status(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Maximum retry attempts exceeded
    #[error("Maximum retry attempts exceeded")]
    RetriesExhausted,

    /// Response body did not match the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl ApiError {
    /// True when the caller should wait for a fresh header capture and retry
    pub fn is_auth_retry(&self) -> bool {
        matches!(self, Self::InvalidCredentials)
    }

    /// True when a later attempt may succeed without operator intervention
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidCredentials | Self::RateLimited | Self::Timeout => true,
            Self::Status(status) => *status >= 500,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::RetriesExhausted | Self::MalformedResponse(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_retry_classification() {
        assert!(ApiError::InvalidCredentials.is_auth_retry());
        assert!(!ApiError::RateLimited.is_auth_retry());
        assert!(!ApiError::Status(500).is_auth_retry());
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(ApiError::InvalidCredentials.is_recoverable());
        assert!(ApiError::RateLimited.is_recoverable());
        assert!(ApiError::Timeout.is_recoverable());
        assert!(ApiError::Status(503).is_recoverable());

        assert!(!ApiError::Status(404).is_recoverable());
        assert!(!ApiError::RetriesExhausted.is_recoverable());
        assert!(!ApiError::MalformedResponse("bad body".to_string()).is_recoverable());
    }
}
