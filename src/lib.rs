//! jetway - Automated flight check-in monitor
//!
//! Watches flight reservations and checks each one in the moment the
//! provider's check-in window opens, without a browser babysitting the
//! clock. Reservations are monitored directly by confirmation number or
//! discovered from an account's upcoming trips; each flight gets a worker
//! that fires at departure minus the check-in offset.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration loading and validation
//! - [`monitor`] - Reservation and account polling loops
//! - [`scheduler`] - Worker reconciliation and per-flight check-in tasks
//! - [`client`] - Direct reservation API client
//! - [`browser`] - Browser sidecar interface for header capture
//! - [`headers`] - Captured-header whitelist and shared store
//! - [`models`] - Core data structures and provider response shapes
//! - [`notifications`] - Lifecycle event fan-out
//! - [`fare`] - Post-check-in fare check extension point
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use jetway::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     config.validate()?;
//!     Ok(())
//! }
//! ```

pub mod browser;
pub mod client;
pub mod config;
pub mod error;
pub mod fare;
pub mod headers;
pub mod models;
pub mod monitor;
pub mod notifications;
pub mod scheduler;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::headers::HeaderStore;
    pub use crate::models::{Account, DepartureStatus, Flight, Reservation};
    pub use crate::monitor::{AccountMonitor, ReservationMonitor, ShutdownHandle};
    pub use crate::scheduler::{CheckInPolicy, CheckInScheduler, WorkerState};
}

// Direct re-exports for convenience
pub use models::{Account, DepartureStatus, Flight, Reservation};
