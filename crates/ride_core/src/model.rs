//! Records shared by every component: identities, trips, captains.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RideError, RideResult};

pub type CaptainId = String;
pub type RiderId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Older tokens call riders "user".
    #[serde(alias = "user")]
    Rider,
    Captain,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Rider => f.write_str("rider"),
            Role::Captain => f.write_str("captain"),
        }
    }
}

/// A verified caller: who they are and which side of the marketplace they act for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub role: Role,
}

impl Identity {
    pub fn rider(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Rider,
        }
    }

    pub fn captain(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Captain,
        }
    }

    pub fn is_captain(&self) -> bool {
        self.role == Role::Captain
    }

    /// Fails with `Unauthorized` unless the identity acts in `role`.
    pub fn require(&self, role: Role) -> RideResult<()> {
        if self.role == role {
            Ok(())
        } else {
            Err(RideError::Unauthorized(format!(
                "operation requires the {role} role"
            )))
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.role, self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripId(Uuid);

impl TripId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TripId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TripId {
    type Err = RideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| RideError::Validation(format!("malformed trip id `{s}`")))
    }
}

/// WGS84 point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn validate(&self) -> RideResult<()> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(RideError::Validation(format!(
                "latitude {} out of range",
                self.lat
            )));
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(RideError::Validation(format!(
                "longitude {} out of range",
                self.lng
            )));
        }
        Ok(())
    }
}

/// Named pickup or dropoff point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude")]
    pub lng: f64,
}

impl Place {
    pub fn new(name: impl Into<String>, at: Coordinates) -> Self {
        Self {
            name: name.into(),
            lat: at.lat,
            lng: at.lng,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    Requested,
    Accepted,
    OnTrip,
    Completed,
    Cancelled,
}

impl TripStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TripStatus::Completed | TripStatus::Cancelled)
    }

    /// Legal edges of the trip lifecycle. Terminal states have none.
    pub fn can_transition_to(self, next: TripStatus) -> bool {
        use TripStatus::*;
        matches!(
            (self, next),
            (Requested, Accepted)
                | (Accepted, OnTrip)
                | (OnTrip, Completed)
                | (Requested, Cancelled)
                | (Accepted, Cancelled)
        )
    }

    /// Statuses during which a captain is bound to the trip and streaming location.
    pub fn is_captain_engaged(self) -> bool {
        matches!(self, TripStatus::Accepted | TripStatus::OnTrip)
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TripStatus::Requested => "REQUESTED",
            TripStatus::Accepted => "ACCEPTED",
            TripStatus::OnTrip => "ON_TRIP",
            TripStatus::Completed => "COMPLETED",
            TripStatus::Cancelled => "CANCELLED",
        };
        f.write_str(label)
    }
}

/// Rider input for a new trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRequest {
    pub origin: Place,
    pub destination: Place,
    pub capacity: u32,
}

impl TripRequest {
    pub fn validate(&self) -> RideResult<()> {
        if self.capacity == 0 {
            return Err(RideError::Validation("capacity must be positive".into()));
        }
        self.origin.coordinates().validate()?;
        self.destination.coordinates().validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: TripId,
    pub rider_id: RiderId,
    pub captain_id: Option<CaptainId>,
    pub origin: Place,
    pub destination: Place,
    pub capacity: u32,
    pub pricing: f64,
    /// Only the rider ever sees the code; it never goes out with the trip record.
    #[serde(skip_serializing, default)]
    pub otp: String,
    pub status: TripStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    pub fn requested(
        rider_id: impl Into<RiderId>,
        request: TripRequest,
        pricing: f64,
        otp: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TripId::new(),
            rider_id: rider_id.into(),
            captain_id: None,
            origin: request.origin,
            destination: request.destination,
            capacity: request.capacity,
            pricing,
            otp,
            status: TripStatus::Requested,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == TripStatus::Requested && self.captain_id.is_none()
    }

    pub fn is_party(&self, identity: &Identity) -> bool {
        match identity.role {
            Role::Rider => self.rider_id == identity.id,
            Role::Captain => self.captain_id.as_deref() == Some(identity.id.as_str()),
        }
    }

    pub fn rider(&self) -> Identity {
        Identity::rider(self.rider_id.clone())
    }

    pub fn captain(&self) -> Option<Identity> {
        self.captain_id.clone().map(Identity::captain)
    }
}

/// Captain eligibility flags as the store keeps them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Captain {
    pub id: CaptainId,
    pub online: bool,
    pub pooling_for_work: bool,
    pub assigned_to_trip: bool,
    pub last_location: Option<Coordinates>,
}

impl Captain {
    pub fn offline(id: impl Into<CaptainId>) -> Self {
        Self {
            id: id.into(),
            online: false,
            pooling_for_work: false,
            assigned_to_trip: false,
            last_location: None,
        }
    }

    pub fn is_eligible(&self) -> bool {
        self.online && self.pooling_for_work && !self.assigned_to_trip
    }
}
