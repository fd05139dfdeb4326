//! Reservation and account monitors
//!
//! A monitor owns one [`CheckInScheduler`] and drives it on a polling
//! loop. [`ReservationMonitor`] watches a fixed list of confirmation
//! numbers and stops once every tracked flight has departed.
//! [`AccountMonitor`] logs into an account each cycle, discovers its
//! flight reservations from the upcoming-trips listing and keeps watching
//! indefinitely, picking up new bookings as they appear.
//!
//! Every cycle refreshes the shared header store from the browser capture
//! before any direct API call is made. A failed cycle never tears down
//! workers: reconciliation is skipped and the previous worker set stays in
//! place until a lookup succeeds again.

use reqwest::header::HeaderMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::browser::BrowserSession;
use crate::error::Result;
use crate::headers::prune_captured;
use crate::models::{Account, AirportTimezones, Flight, Reservation};
use crate::notifications::NotificationHandler;
use crate::scheduler::CheckInScheduler;
use crate::utils::error::ApiError;

/// Handle to stop a running monitor from another task
///
/// Backed by a watch channel, so a stop request interrupts the monitor's
/// inter-poll sleep immediately instead of waiting it out.
#[derive(Clone)]
pub struct ShutdownHandle {
    stop_tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Request the monitor loop to stop after its current cycle
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }
}

/// Monitors a fixed set of reservations by confirmation number
pub struct ReservationMonitor {
    session: Arc<dyn BrowserSession>,
    scheduler: CheckInScheduler,
    reservations: Vec<Reservation>,
    timezones: Arc<AirportTimezones>,
    notifier: Arc<NotificationHandler>,
    poll_interval: Duration,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl ReservationMonitor {
    pub fn new(
        session: Arc<dyn BrowserSession>,
        scheduler: CheckInScheduler,
        reservations: Vec<Reservation>,
        timezones: Arc<AirportTimezones>,
        notifier: Arc<NotificationHandler>,
        poll_interval: Duration,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            session,
            scheduler,
            reservations,
            timezones,
            notifier,
            poll_interval,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
        }
    }

    /// Handle for stopping the monitor loop
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            stop_tx: self.stop_tx.clone(),
        }
    }

    /// Scheduler access for inspection
    pub fn scheduler(&self) -> &CheckInScheduler {
        &self.scheduler
    }

    /// Run one lookup-and-reconcile cycle
    ///
    /// Every reservation must resolve for the cycle to count; a single
    /// failed lookup aborts the cycle before reconciliation so a transient
    /// error cannot cancel healthy workers.
    pub async fn poll_once(&mut self) -> Result<()> {
        let mut flights = Vec::new();
        let mut headers = HeaderMap::new();

        for reservation in &self.reservations {
            let capture = self.session.load_reservation(reservation).await?;
            headers.extend(prune_captured(&capture.requests));
            flights.extend(parse_reservation_page(capture.data, reservation, &self.timezones)?);
        }

        let added = self.scheduler.reconcile(flights, headers).await;
        self.notifier.new_flights(&added).await;
        Ok(())
    }

    /// Poll until stopped or every tracked flight has departed
    pub async fn monitor(&mut self) {
        loop {
            match self.poll_once().await {
                Ok(()) => {
                    if self.scheduler.checkin_handlers() == 0 {
                        tracing::info!("All monitored flights have departed, stopping");
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Reservation lookup failed, keeping current workers");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = self.stop_rx.wait_for(|stopped| *stopped) => break,
            }
        }

        self.scheduler.shutdown();
    }
}

/// Monitors every flight reservation of one account
pub struct AccountMonitor {
    session: Arc<dyn BrowserSession>,
    scheduler: CheckInScheduler,
    account: Account,
    timezones: Arc<AirportTimezones>,
    notifier: Arc<NotificationHandler>,
    poll_interval: Duration,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl AccountMonitor {
    pub fn new(
        session: Arc<dyn BrowserSession>,
        scheduler: CheckInScheduler,
        account: Account,
        timezones: Arc<AirportTimezones>,
        notifier: Arc<NotificationHandler>,
        poll_interval: Duration,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            session,
            scheduler,
            account,
            timezones,
            notifier,
            poll_interval,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
        }
    }

    /// Handle for stopping the monitor loop
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            stop_tx: self.stop_tx.clone(),
        }
    }

    /// Scheduler access for inspection
    pub fn scheduler(&self) -> &CheckInScheduler {
        &self.scheduler
    }

    /// Run one login-discover-reconcile cycle
    ///
    /// A rejected login is reported through the notifier and skips the
    /// cycle without becoming an error; the account may just be locked out
    /// temporarily for too many attempts.
    pub async fn poll_once(&mut self) -> Result<()> {
        let capture = match self.session.login(&self.account).await {
            Ok(capture) => capture,
            Err(ApiError::InvalidCredentials) => {
                tracing::warn!(username = %self.account.username, "Login rejected, skipping cycle");
                self.notifier
                    .login_error(&self.account.username, "login rejected by the provider")
                    .await;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        // Fresh headers must land before the direct lookups below
        let headers = prune_captured(&capture.requests);
        if !headers.is_empty() {
            self.scheduler.header_store().replace(headers).await;
        }

        let client = self.scheduler.client();
        let mut flights = Vec::new();
        for trip in capture.trips.iter().filter(|t| t.is_flight()) {
            if let Some(confirmation) = &trip.confirmation_number {
                let reservation =
                    Reservation::new(confirmation, &capture.first_name, &capture.last_name);
                flights.extend(client.view_reservation(&reservation, &self.timezones).await?);
            }
        }

        let added = self.scheduler.reconcile(flights, HeaderMap::new()).await;
        self.notifier.new_flights(&added).await;
        Ok(())
    }

    /// Poll until stopped
    ///
    /// Unlike a reservation monitor this never exits on its own; an empty
    /// trip list today says nothing about tomorrow's bookings.
    pub async fn monitor(&mut self) {
        loop {
            if let Err(e) = self.poll_once().await {
                tracing::error!(error = %e, "Account poll failed, keeping current workers");
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = self.stop_rx.wait_for(|stopped| *stopped) => break,
            }
        }

        self.scheduler.shutdown();
    }
}

/// Parse the captured view-reservation page into flights
fn parse_reservation_page(
    data: serde_json::Value,
    reservation: &Reservation,
    timezones: &AirportTimezones,
) -> Result<Vec<Flight>> {
    let response: crate::models::ViewReservationResponse = serde_json::from_value(data)
        .map_err(|e| ApiError::MalformedResponse(format!("view-reservation page: {e}")))?;

    let flights = response
        .page
        .bounds
        .iter()
        .map(|bound| Flight::from_bound(bound, reservation, timezones))
        .collect::<std::result::Result<Vec<_>, ApiError>>()?;

    Ok(flights)
}

