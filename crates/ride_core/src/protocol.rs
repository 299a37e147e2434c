//! Real-time channel wire format.
//!
//! Every frame is a JSON envelope `{"type": ..., "payload": ...}`. Both directions
//! are closed enums; anything that does not parse into one is answered with an
//! `error` frame and otherwise ignored.

use serde::{Deserialize, Serialize};

use crate::error::{RideError, RideResult};
use crate::model::{Coordinates, Place, Trip, TripId, TripStatus};

/// Channel opened without a credential.
pub const CLOSE_MISSING_TOKEN: u16 = 4001;
/// Credential present but rejected.
pub const CLOSE_INVALID_TOKEN: u16 = 4002;
/// A newer channel for the same identity took over.
pub const CLOSE_SUPERSEDED: u16 = 4003;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    #[serde(rename = "subscribe:trip")]
    SubscribeTrip(SubscribePayload),
    /// With `tripId`: live report for an active trip. Without: pooling report.
    #[serde(rename = "send:location")]
    SendLocation(LocationReport),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribePayload {
    pub trip_id: TripId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationReport {
    pub lat: f64,
    pub long: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<TripId>,
}

impl LocationReport {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.long)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerEvent {
    #[serde(rename = "subscribed")]
    Subscribed(TripStatusPayload),
    #[serde(rename = "status:update")]
    StatusUpdate(TripStatusPayload),
    #[serde(rename = "location:update")]
    LocationUpdate(LocationPayload),
    /// Sent to nearby pooling captains when a trip is waiting for a manual accept.
    #[serde(rename = "trip:available")]
    TripAvailable(AvailableTripPayload),
    #[serde(rename = "error")]
    Error(ErrorPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripStatusPayload {
    pub trip_id: TripId,
    pub status: TripStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPayload {
    pub trip_id: TripId,
    pub lat: f64,
    pub long: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableTripPayload {
    pub trip_id: TripId,
    pub origin: Place,
    pub destination: Place,
    pub capacity: u32,
    pub pricing: f64,
    pub pickup_distance_m: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

impl ServerEvent {
    pub fn status_update(trip: &Trip) -> Self {
        Self::StatusUpdate(TripStatusPayload {
            trip_id: trip.id,
            status: trip.status,
        })
    }

    pub fn location_update(trip_id: TripId, at: Coordinates) -> Self {
        Self::LocationUpdate(LocationPayload {
            trip_id,
            lat: at.lat,
            long: at.lng,
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            message: message.into(),
        })
    }

    pub fn to_json(&self) -> String {
        // Every variant is plain data with string keys; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"type":"error","payload":{"message":"encoding failed"}}"#.to_string()
        })
    }
}

pub fn parse_client_message(text: &str) -> RideResult<ClientMessage> {
    serde_json::from_str(text).map_err(|err| RideError::Validation(format!("bad frame: {err}")))
}
