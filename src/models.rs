//! Core data structures and types
//!
//! Defines the reservation domain model (flights, reservations, accounts),
//! the serde shapes of the provider's JSON responses, and the airport
//! timezone table used to resolve local departure times into absolute
//! instants.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::utils::error::ApiError;

/// A confirmation number + traveler name pair, the unit a user registers
/// for monitoring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub confirmation_number: String,
    pub first_name: String,
    pub last_name: String,
}

impl Reservation {
    pub fn new(
        confirmation_number: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            confirmation_number: confirmation_number.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// Traveler name as shown in notifications
    pub fn traveler(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A login credential pair; reservations are discovered via its trip list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub password: String,
}

/// Departure status of one bound
///
/// The provider reports this as a nullable string. Anything other than the
/// scheduled sentinel (null) is treated as terminal, since the provider's
/// full terminal vocabulary beyond `DEPARTED` is not documented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepartureStatus {
    /// Null status: the flight has not left yet
    Scheduled,
    /// The provider reported `DEPARTED`
    Departed,
    /// Any other non-null status string
    Other(String),
}

impl DepartureStatus {
    /// Map the provider's nullable status string onto the enum
    pub fn from_api(status: Option<&str>) -> Self {
        match status {
            None => Self::Scheduled,
            Some("DEPARTED") => Self::Departed,
            Some(other) => Self::Other(other.to_string()),
        }
    }

    /// Terminal statuses remove the flight from monitoring
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Scheduled)
    }
}

/// One directional leg of a reservation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flight {
    /// The reservation this bound belongs to (carries the traveler name
    /// needed for the check-in request)
    pub reservation: Reservation,
    pub departure_airport_code: String,
    pub departure_airport_name: String,
    pub arrival_airport_name: String,
    pub departure_date: NaiveDate,
    pub departure_time: NaiveTime,
    pub arrival_time: NaiveTime,
    pub status: DepartureStatus,
    /// Departure local time resolved to an absolute instant via the
    /// airport timezone table
    pub departure_utc: DateTime<Utc>,
}

impl Flight {
    /// Build a flight from one bound of a view-reservation response
    pub fn from_bound(
        bound: &BoundPage,
        reservation: &Reservation,
        timezones: &AirportTimezones,
    ) -> Result<Self, ApiError> {
        let departure_time = NaiveTime::parse_from_str(&bound.departure_time, "%H:%M")
            .map_err(|e| ApiError::MalformedResponse(format!("bad departure time: {e}")))?;
        let arrival_time = NaiveTime::parse_from_str(&bound.arrival_time, "%H:%M")
            .map_err(|e| ApiError::MalformedResponse(format!("bad arrival time: {e}")))?;

        let departure_utc = timezones.to_utc(
            &bound.departure_airport.code,
            bound.departure_date.and_time(departure_time),
        );

        Ok(Self {
            reservation: reservation.clone(),
            departure_airport_code: bound.departure_airport.code.clone(),
            departure_airport_name: bound.departure_airport.name.clone(),
            arrival_airport_name: bound.arrival_airport.name.clone(),
            departure_date: bound.departure_date,
            departure_time,
            arrival_time,
            status: DepartureStatus::from_api(bound.departure_status.as_deref()),
            departure_utc,
        })
    }

    /// Stable identity for the scheduler's worker map
    ///
    /// Two bounds of the same reservation differ in airport and instant, so
    /// this triple is unique per tracked flight.
    pub fn id(&self) -> String {
        format!(
            "{}-{}-{}",
            self.reservation.confirmation_number,
            self.departure_airport_code,
            self.departure_utc.to_rfc3339()
        )
    }

    /// Short human-readable description for logs and notifications
    pub fn describe(&self) -> String {
        format!(
            "{} {} -> {} on {} at {}",
            self.reservation.confirmation_number,
            self.departure_airport_code,
            self.arrival_airport_name,
            self.departure_date,
            self.departure_time.format("%H:%M")
        )
    }
}

impl PartialEq for Flight {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Flight {}

// ============================================================================
// Provider response shapes
// ============================================================================

/// Top-level view-reservation response
#[derive(Debug, Clone, Deserialize)]
pub struct ViewReservationResponse {
    #[serde(rename = "viewReservationViewPage")]
    pub page: ReservationPage,
}

/// The bounds list inside a view-reservation response
#[derive(Debug, Clone, Deserialize)]
pub struct ReservationPage {
    pub bounds: Vec<BoundPage>,
}

/// One bound as the provider serializes it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundPage {
    pub arrival_airport: ArrivalAirport,
    pub arrival_time: String,
    pub departure_airport: DepartureAirport,
    pub departure_date: NaiveDate,
    pub departure_status: Option<String>,
    pub departure_time: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArrivalAirport {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepartureAirport {
    pub code: String,
    pub name: String,
}

/// Traveler profile fields from the login response
///
/// The provider flattens these under dotted keys.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginProfile {
    #[serde(rename = "customers.userInformation.firstName")]
    pub first_name: String,
    #[serde(rename = "customers.userInformation.lastName")]
    pub last_name: String,
}

/// One entry of the upcoming-trips listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingTrip {
    #[serde(rename = "tripType")]
    pub trip_type: String,
    #[serde(rename = "confirmationNumber")]
    pub confirmation_number: Option<String>,
}

impl UpcomingTrip {
    /// Only flight-type trips are monitored; cars, hotels and the rest of
    /// the listing are discarded
    pub fn is_flight(&self) -> bool {
        self.trip_type == "FLIGHT" && self.confirmation_number.is_some()
    }
}

/// Trips listing from the login flow
#[derive(Debug, Clone, Deserialize)]
pub struct TripsResponse {
    #[serde(rename = "upcomingTripsPage")]
    pub trips: Vec<UpcomingTrip>,
}

// ============================================================================
// Airport timezone table
// ============================================================================

/// Airport code to IANA timezone lookup
///
/// The mapping itself is external data (a JSON file of `"LAX":
/// "America/Los_Angeles"` pairs); this type only loads it and resolves
/// local departure times to UTC.
#[derive(Debug, Clone, Default)]
pub struct AirportTimezones {
    zones: HashMap<String, Tz>,
}

impl AirportTimezones {
    /// Empty table; every lookup falls back to UTC
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the table from a JSON file of airport-code -> zone-name pairs
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let raw: HashMap<String, String> = serde_json::from_str(&content)?;
        Self::from_map(raw)
    }

    /// Build the table from an in-memory map of zone names
    pub fn from_map(raw: HashMap<String, String>) -> anyhow::Result<Self> {
        let mut zones = HashMap::with_capacity(raw.len());
        for (code, name) in raw {
            let tz: Tz = name
                .parse()
                .map_err(|e| anyhow::anyhow!("unknown timezone '{name}' for {code}: {e}"))?;
            zones.insert(code, tz);
        }
        Ok(Self { zones })
    }

    /// Look up the zone for an airport code
    pub fn zone_for(&self, code: &str) -> Option<Tz> {
        self.zones.get(code).copied()
    }

    /// Resolve an airport-local datetime to UTC
    ///
    /// Unknown airports resolve as if the local time were already UTC; a
    /// wrong check-in instant for one flight must not fail the whole
    /// lookup.
    pub fn to_utc(&self, code: &str, local: chrono::NaiveDateTime) -> DateTime<Utc> {
        match self.zone_for(code) {
            Some(tz) => match tz.from_local_datetime(&local).earliest() {
                Some(dt) => dt.with_timezone(&Utc),
                None => {
                    tracing::warn!(airport = code, %local, "Local time skipped by DST, using UTC");
                    Utc.from_utc_datetime(&local)
                }
            },
            None => {
                tracing::warn!(airport = code, "Airport not in timezone table, using UTC");
                Utc.from_utc_datetime(&local)
            }
        }
    }
}
