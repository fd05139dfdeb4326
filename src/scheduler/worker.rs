//! Per-flight check-in workers
//!
//! Each tracked flight gets one worker task. The worker sleeps until the
//! check-in window opens, then attempts the check-in with a bounded retry
//! budget. State transitions are published on a watch channel and terminal
//! states are reported back to the scheduler through an event channel.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::client::ReservationClient;
use crate::fare::FareChecker;
use crate::models::Flight;
use crate::notifications::NotificationHandler;
use crate::utils::error::ApiError;

/// Worker lifecycle states
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerState {
    /// Sleeping until the check-in window opens
    Waiting,
    /// A check-in request is in flight
    Attempting,
    /// The previous attempt failed; waiting before trying again
    Retrying { attempt: u32 },
    /// The flight was checked in
    Succeeded,
    /// The retry budget is exhausted
    Failed,
}

impl WorkerState {
    /// Whether the worker has finished, one way or the other
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Timing and retry policy shared by all workers
#[derive(Debug, Clone)]
pub struct CheckInPolicy {
    /// How long before departure the check-in window opens
    pub checkin_opens: chrono::Duration,
    /// Total attempts per flight, counting the first
    pub max_attempts: u32,
    /// Pause between attempts
    pub retry_wait: Duration,
}

impl Default for CheckInPolicy {
    fn default() -> Self {
        Self {
            checkin_opens: chrono::Duration::hours(24),
            max_attempts: 4,
            retry_wait: Duration::from_secs(30),
        }
    }
}

/// Terminal-state report from a worker to the scheduler
#[derive(Debug, Clone)]
pub struct WorkerEvent {
    pub flight_id: String,
    pub state: WorkerState,
}

/// Handle to a spawned worker
pub struct WorkerHandle {
    flight: Flight,
    state_rx: watch::Receiver<WorkerState>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// The flight this worker is responsible for
    pub fn flight(&self) -> &Flight {
        &self.flight
    }

    /// Current worker state
    pub fn state(&self) -> WorkerState {
        self.state_rx.borrow().clone()
    }

    /// Abort the worker task
    ///
    /// Used when the flight disappears from the reservation or departs
    /// before the window opens.
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// Wait until the worker reaches a terminal state
    pub async fn wait_until_terminal(&self) -> WorkerState {
        let mut rx = self.state_rx.clone();
        loop {
            let state = rx.borrow_and_update().clone();
            if state.is_terminal() {
                return state;
            }
            if rx.changed().await.is_err() {
                return self.state_rx.borrow().clone();
            }
        }
    }
}

/// Spawn a worker task for one flight
pub fn spawn_worker(
    flight: Flight,
    client: Arc<ReservationClient>,
    policy: CheckInPolicy,
    notifier: Arc<NotificationHandler>,
    fare: Arc<dyn FareChecker>,
    events: mpsc::UnboundedSender<WorkerEvent>,
) -> WorkerHandle {
    let (state_tx, state_rx) = watch::channel(WorkerState::Waiting);
    let worker_flight = flight.clone();

    let task = tokio::spawn(async move {
        run(worker_flight, client, policy, notifier, fare, state_tx, events).await;
    });

    WorkerHandle { flight, state_rx, task }
}

async fn run(
    flight: Flight,
    client: Arc<ReservationClient>,
    policy: CheckInPolicy,
    notifier: Arc<NotificationHandler>,
    fare: Arc<dyn FareChecker>,
    state_tx: watch::Sender<WorkerState>,
    events: mpsc::UnboundedSender<WorkerEvent>,
) {
    let opens_at = flight.departure_utc - policy.checkin_opens;
    let now = Utc::now();

    if opens_at > now {
        let wait = (opens_at - now).to_std().unwrap_or(Duration::ZERO);
        tracing::info!(
            flight = %flight.describe(),
            opens_at = %opens_at,
            "Waiting for check-in window"
        );
        tokio::time::sleep(wait).await;
    }

    let terminal = attempt_loop(&flight, &client, &policy, &notifier, &fare, &state_tx).await;

    let _ = state_tx.send(terminal.clone());
    let _ = events.send(WorkerEvent {
        flight_id: flight.id(),
        state: terminal,
    });
}

async fn attempt_loop(
    flight: &Flight,
    client: &ReservationClient,
    policy: &CheckInPolicy,
    notifier: &NotificationHandler,
    fare: &Arc<dyn FareChecker>,
    state_tx: &watch::Sender<WorkerState>,
) -> WorkerState {
    let mut last_error = String::new();

    for attempt in 1..=policy.max_attempts {
        let _ = state_tx.send(WorkerState::Attempting);

        match client.check_in(flight).await {
            Ok(_) => {
                tracing::info!(flight = %flight.describe(), attempt, "Check-in succeeded");

                if let Err(e) = fare.check_flight_price(flight).await {
                    tracing::warn!(flight = %flight.describe(), error = %e, "Fare check failed");
                }

                notifier.checkin_success(flight).await;
                return WorkerState::Succeeded;
            }
            Err(e) => {
                log_attempt_failure(flight, attempt, &e);
                last_error = e.to_string();

                if attempt < policy.max_attempts {
                    let _ = state_tx.send(WorkerState::Retrying { attempt });
                    tokio::time::sleep(policy.retry_wait).await;
                }
            }
        }
    }

    tracing::error!(
        flight = %flight.describe(),
        attempts = policy.max_attempts,
        "Check-in retry budget exhausted"
    );
    notifier.checkin_failure(flight, last_error).await;
    WorkerState::Failed
}

fn log_attempt_failure(flight: &Flight, attempt: u32, error: &ApiError) {
    if error.is_auth_retry() {
        tracing::warn!(
            flight = %flight.describe(),
            attempt,
            "Check-in rejected pending fresh headers, will retry"
        );
    } else if matches!(error, ApiError::RateLimited) {
        tracing::warn!(flight = %flight.describe(), attempt, "Check-in rate limited, will retry");
    } else {
        tracing::warn!(flight = %flight.describe(), attempt, error = %error, "Check-in attempt failed");
    }
}
