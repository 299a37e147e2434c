//! Test helpers for common fixture setup.
//!
//! Compiled for unit tests and behind the `test-helpers` feature so integration
//! tests and benches can share them.

use tokio::sync::mpsc;

use crate::model::{Coordinates, Place, TripRequest};
use crate::protocol::ServerEvent;
use crate::registry::Outbound;
use crate::spatial::EARTH_RADIUS_M;

/// A fixed pickup point in central Bengaluru used across tests.
pub fn test_origin() -> Coordinates {
    Coordinates::new(12.9716, 77.5946)
}

/// Point `meters` due north of `at`. Great-circle distance back to `at` is `meters`.
pub fn offset_north(at: Coordinates, meters: f64) -> Coordinates {
    let delta_lat = (meters / EARTH_RADIUS_M).to_degrees();
    Coordinates::new(at.lat + delta_lat, at.lng)
}

/// Point roughly `meters` due east of `at`.
pub fn offset_east(at: Coordinates, meters: f64) -> Coordinates {
    let delta_lng = (meters / (EARTH_RADIUS_M * at.lat.to_radians().cos())).to_degrees();
    Coordinates::new(at.lat, at.lng + delta_lng)
}

/// Trip request from `origin` to a point 3 km north of it.
pub fn trip_request(origin: Coordinates, capacity: u32) -> TripRequest {
    TripRequest {
        origin: Place::new("pickup", origin),
        destination: Place::new("dropoff", offset_north(origin, 3_000.0)),
        capacity,
    }
}

/// Everything queued on a channel right now, events only.
pub fn drain_events(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        if let Outbound::Event(event) = frame {
            events.push(event);
        }
    }
    events
}
