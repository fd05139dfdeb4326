//! Account monitoring: trip discovery, round trips and login trouble

mod common;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{
    captured_request, round_trip_page, scheduler_for, CountingFareChecker, RecordingChannel,
    ScriptedSession,
};
use jetway::browser::LoginCapture;
use jetway::client::{CHECKIN_URL, VIEW_RESERVATION_URL};
use jetway::error::ApiError;
use jetway::models::{Account, AirportTimezones, UpcomingTrip};
use jetway::monitor::AccountMonitor;
use jetway::notifications::NotificationHandler;
use jetway::scheduler::WorkerState;

fn login_capture() -> LoginCapture {
    LoginCapture {
        first_name: "Forrest".to_string(),
        last_name: "Gump".to_string(),
        trips: vec![
            UpcomingTrip {
                trip_type: "FLIGHT".to_string(),
                confirmation_number: Some("TEST".to_string()),
            },
            UpcomingTrip {
                trip_type: "CAR".to_string(),
                confirmation_number: None,
            },
        ],
        requests: vec![captured_request()],
    }
}

fn test_account() -> Account {
    Account {
        username: "test_user".to_string(),
        password: "test_pass".to_string(),
    }
}

async fn mock_api(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/{VIEW_RESERVATION_URL}TEST")))
        .and(header("x-api-key", "test_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(round_trip_page(None)))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/{CHECKIN_URL}TEST")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "checkInViewReservationPage": {
                "_links": {
                    "checkIn": {
                        "href": "mobile-air-operations/v1/mobile-air-operations/page/check-in",
                        "body": {"checkInSessionToken": "token"},
                    }
                }
            }
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(
            "/mobile-air-operations/v1/mobile-air-operations/page/check-in",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "checkInConfirmationPage": {"flights": []},
        })))
        .mount(server)
        .await;
}

/// Both bounds of a discovered round trip get workers, car rentals are
/// ignored, and the workers check in under the account holder's name.
#[tokio::test]
async fn test_round_trip_discovery_and_checkin() {
    let server = MockServer::start().await;
    mock_api(&server).await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut handler = NotificationHandler::new();
    handler.add_channel(Box::new(RecordingChannel { seen: seen.clone() }));
    let notifier = Arc::new(handler);
    let fare = Arc::new(CountingFareChecker::default());

    let session = ScriptedSession::default();
    session.push_login(Ok(login_capture()));

    let mut monitor = AccountMonitor::new(
        Arc::new(session),
        scheduler_for(&server, notifier.clone(), fare.clone()),
        test_account(),
        Arc::new(AirportTimezones::new()),
        notifier,
        Duration::from_secs(3600),
    );

    monitor.poll_once().await.unwrap();
    assert_eq!(monitor.scheduler().checkin_handlers(), 2);

    for flight in monitor.scheduler().flights() {
        assert_eq!(flight.reservation.traveler(), "Forrest Gump");
        assert_eq!(flight.reservation.confirmation_number, "TEST");
    }

    let handles: Vec<_> = monitor.scheduler().workers().collect();
    for handle in &handles {
        assert_eq!(handle.wait_until_terminal().await, WorkerState::Succeeded);
    }

    assert_eq!(fare.calls.load(Ordering::SeqCst), 2);

    let kinds = seen.lock().unwrap().clone();
    assert_eq!(kinds[0], "new_flights");
    assert_eq!(
        kinds.iter().filter(|k| *k == "checkin_success").count(),
        2
    );
}

/// A rejected login is announced and skips the cycle; the workers from
/// earlier cycles survive and the monitor recovers on the next login.
#[tokio::test]
async fn test_rejected_login_spares_workers() {
    let server = MockServer::start().await;
    mock_api(&server).await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut handler = NotificationHandler::new();
    handler.add_channel(Box::new(RecordingChannel { seen: seen.clone() }));
    let notifier = Arc::new(handler);
    let fare = Arc::new(CountingFareChecker::default());

    let session = ScriptedSession::default();
    session.push_login(Ok(login_capture()));
    session.push_login(Err(ApiError::InvalidCredentials));
    session.push_login(Ok(login_capture()));

    let mut monitor = AccountMonitor::new(
        Arc::new(session),
        scheduler_for(&server, notifier.clone(), fare.clone()),
        test_account(),
        Arc::new(AirportTimezones::new()),
        notifier,
        Duration::from_secs(3600),
    );

    monitor.poll_once().await.unwrap();
    assert_eq!(monitor.scheduler().checkin_handlers(), 2);

    let handles: Vec<_> = monitor.scheduler().workers().collect();
    for handle in &handles {
        assert_eq!(handle.wait_until_terminal().await, WorkerState::Succeeded);
    }

    // Rejected login: announced, nothing torn down
    monitor.poll_once().await.unwrap();
    assert_eq!(monitor.scheduler().checkin_handlers(), 2);
    assert_eq!(seen.lock().unwrap().last().unwrap(), "login_error");

    // Next successful login re-sees the same flights without re-scheduling
    monitor.poll_once().await.unwrap();
    assert_eq!(monitor.scheduler().checkin_handlers(), 2);
    assert_eq!(fare.calls.load(Ordering::SeqCst), 2);
}

/// Stopping a monitor interrupts its inter-poll sleep right away instead
/// of waiting out the full interval
#[tokio::test]
async fn test_stop_interrupts_poll_sleep() {
    let server = MockServer::start().await;

    let notifier = Arc::new(NotificationHandler::new());
    let fare = Arc::new(CountingFareChecker::default());

    // No scripted logins: every poll fails and the monitor goes back to
    // its hour-long sleep
    let session = ScriptedSession::default();

    let mut monitor = AccountMonitor::new(
        Arc::new(session),
        scheduler_for(&server, notifier.clone(), fare),
        test_account(),
        Arc::new(AirportTimezones::new()),
        notifier,
        Duration::from_secs(3600),
    );
    let handle = monitor.shutdown_handle();
    assert!(!handle.is_stopped());

    let task = tokio::spawn(async move { monitor.monitor().await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    handle.stop();
    assert!(handle.is_stopped());
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("monitor should stop well before the poll interval elapses")
        .unwrap();
}

/// A failed reservation lookup mid-cycle skips reconciliation entirely
#[tokio::test]
async fn test_failed_lookup_skips_reconcile() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let notifier = Arc::new(NotificationHandler::new());
    let fare = Arc::new(CountingFareChecker::default());

    let session = ScriptedSession::default();
    session.push_login(Ok(login_capture()));

    let mut monitor = AccountMonitor::new(
        Arc::new(session),
        scheduler_for(&server, notifier.clone(), fare),
        test_account(),
        Arc::new(AirportTimezones::new()),
        notifier,
        Duration::from_secs(3600),
    );

    assert!(monitor.poll_once().await.is_err());
    assert_eq!(monitor.scheduler().checkin_handlers(), 0);
}
