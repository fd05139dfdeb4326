//! Check-in scheduling
//!
//! The scheduler owns one worker per tracked flight and reconciles that
//! set against each fresh reservation lookup: new flights get a worker,
//! flights that disappeared or departed get theirs torn down. Reconciling
//! the same flight list twice is a no-op.

pub mod worker;

use reqwest::header::HeaderMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::client::ReservationClient;
use crate::fare::FareChecker;
use crate::headers::HeaderStore;
use crate::models::Flight;
use crate::notifications::NotificationHandler;

pub use worker::{spawn_worker, CheckInPolicy, WorkerEvent, WorkerHandle, WorkerState};

/// Reconciles tracked flights against reservation lookups
pub struct CheckInScheduler {
    header_store: Arc<HeaderStore>,
    client: Arc<ReservationClient>,
    notifier: Arc<NotificationHandler>,
    fare: Arc<dyn FareChecker>,
    policy: CheckInPolicy,

    /// One worker per flight id
    workers: HashMap<String, WorkerHandle>,

    events_tx: mpsc::UnboundedSender<WorkerEvent>,
    events_rx: mpsc::UnboundedReceiver<WorkerEvent>,
}

impl CheckInScheduler {
    pub fn new(
        header_store: Arc<HeaderStore>,
        client: Arc<ReservationClient>,
        notifier: Arc<NotificationHandler>,
        fare: Arc<dyn FareChecker>,
        policy: CheckInPolicy,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            header_store,
            client,
            notifier,
            fare,
            policy,
            workers: HashMap::new(),
            events_tx,
            events_rx,
        }
    }

    /// Shared header state used by the client
    pub fn header_store(&self) -> Arc<HeaderStore> {
        self.header_store.clone()
    }

    /// API client shared with the workers
    pub fn client(&self) -> Arc<ReservationClient> {
        self.client.clone()
    }

    /// Flights currently tracked, terminal workers included
    pub fn flights(&self) -> Vec<Flight> {
        self.workers.values().map(|w| w.flight().clone()).collect()
    }

    /// Number of live worker handles
    pub fn checkin_handlers(&self) -> usize {
        self.workers.len()
    }

    /// Worker handles currently held, for inspection
    pub fn workers(&self) -> impl Iterator<Item = &WorkerHandle> {
        self.workers.values()
    }

    /// Reconcile the worker set against a fresh lookup
    ///
    /// `flights` is the complete current flight list of the monitored
    /// reservations; `headers` are the pruned headers captured during the
    /// lookup. Returns the flights that were newly scheduled.
    pub async fn reconcile(&mut self, flights: Vec<Flight>, headers: HeaderMap) -> Vec<Flight> {
        if !headers.is_empty() {
            self.header_store.replace(headers).await;
        }

        self.drain_events();

        let current_ids: HashSet<String> = flights
            .iter()
            .filter(|f| !f.status.is_terminal())
            .map(|f| f.id())
            .collect();

        let stale: Vec<String> = self
            .workers
            .keys()
            .filter(|id| !current_ids.contains(*id))
            .cloned()
            .collect();
        for id in stale {
            if let Some(handle) = self.workers.remove(&id) {
                if !handle.state().is_terminal() {
                    tracing::info!(flight = %handle.flight().describe(), "Flight no longer tracked, cancelling worker");
                    handle.cancel();
                } else {
                    tracing::debug!(flight = %handle.flight().describe(), "Dropping finished worker");
                }
            }
        }

        let mut added = Vec::new();
        for flight in flights {
            if flight.status.is_terminal() {
                continue;
            }
            let id = flight.id();
            if self.workers.contains_key(&id) {
                continue;
            }

            tracing::info!(flight = %flight.describe(), "Scheduling check-in worker");
            let handle = spawn_worker(
                flight.clone(),
                self.client.clone(),
                self.policy.clone(),
                self.notifier.clone(),
                self.fare.clone(),
                self.events_tx.clone(),
            );
            self.workers.insert(id, handle);
            added.push(flight);
        }

        added
    }

    /// Record terminal-state reports without dropping the handles
    ///
    /// Finished workers stay in the map so their flights keep counting as
    /// tracked until a lookup shows them departed or gone.
    fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            tracing::debug!(flight_id = %event.flight_id, state = ?event.state, "Worker finished");
        }
    }

    /// Cancel every worker
    pub fn shutdown(&mut self) {
        for (_, handle) in self.workers.drain() {
            handle.cancel();
        }
    }
}
