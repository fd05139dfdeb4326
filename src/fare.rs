//! Fare checking extension point
//!
//! After a worker checks its flight in, the scheduler hands the flight to
//! a [`FareChecker`]. The default implementation only logs; alternate
//! implementations can query fares and notify on price drops. Fare check
//! failures never affect the check-in outcome.

use async_trait::async_trait;

use crate::models::Flight;

/// Post-check-in hook for fare inspection
#[async_trait]
pub trait FareChecker: Send + Sync {
    /// Inspect the current fare for a checked-in flight
    async fn check_flight_price(&self, flight: &Flight) -> anyhow::Result<()>;
}

/// Default fare checker that records the request and does nothing else
#[derive(Debug, Default)]
pub struct LoggingFareChecker;

#[async_trait]
impl FareChecker for LoggingFareChecker {
    async fn check_flight_price(&self, flight: &Flight) -> anyhow::Result<()> {
        tracing::debug!(flight = %flight.describe(), "Fare check requested");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AirportTimezones, BoundPage, Reservation};

    fn sample_flight() -> Flight {
        let bound: BoundPage = serde_json::from_value(serde_json::json!({
            "arrivalAirport": {"name": "test_inbound"},
            "arrivalTime": "21:40",
            "departureAirport": {"code": "LAX", "name": "Los Angeles"},
            "departureDate": "2020-10-13",
            "departureStatus": null,
            "departureTime": "14:40",
        }))
        .unwrap();

        let reservation = Reservation::new("TEST", "Berkant", "Marika");
        Flight::from_bound(&bound, &reservation, &AirportTimezones::new()).unwrap()
    }

    #[tokio::test]
    async fn test_logging_checker_always_succeeds() {
        let checker = LoggingFareChecker;
        assert!(checker.check_flight_price(&sample_flight()).await.is_ok());
    }
}
