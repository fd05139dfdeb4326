//! Unified error handling for the jetway crate
//!
//! Consolidates the domain-specific errors into a single [`Error`] enum and
//! classifies every failure into the categories the monitor loop cares
//! about: which failures resolve themselves once fresher headers arrive,
//! which are provider throttling, and which only cost the current poll
//! cycle.

use std::io;
use thiserror::Error;

pub use crate::notifications::channels::ChannelError;
pub use crate::utils::error::ApiError;

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Expired or invalid captured headers, cleared by a fresh capture
    TransientAuth,
    /// Provider throttling, cleared by backing off
    RateLimited,
    /// Malformed or unexpected response, costs one poll cycle
    Lookup,
    /// A worker used its full retry budget, terminal for that flight
    ExhaustedRetry,
    /// Notification delivery problems
    Notification,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

/// Unified error type for the jetway crate
#[derive(Error, Debug)]
pub enum Error {
    /// Reservation API and browser sidecar errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Notification channel errors
    #[error("Notification error: {0}")]
    Notify(#[from] ChannelError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Check if this error is recoverable by a later poll or retry
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Api(e) => e.is_recoverable(),
            // A failed delivery never takes down the monitor
            Self::Notify(_) => true,
            Self::Io(_) => true,
            Self::Json(_) | Self::Config(_) | Self::Other { .. } => false,
        }
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Api(ApiError::InvalidCredentials) => ErrorCategory::TransientAuth,
            Self::Api(ApiError::RateLimited) => ErrorCategory::RateLimited,
            Self::Api(ApiError::RetriesExhausted) => ErrorCategory::ExhaustedRetry,
            Self::Api(_) | Self::Json(_) => ErrorCategory::Lookup,
            Self::Notify(_) => ErrorCategory::Notification,
            Self::Config(_) => ErrorCategory::Config,
            Self::Io(_) | Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: err.to_string(),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
