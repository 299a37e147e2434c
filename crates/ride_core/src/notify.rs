//! Fan-out of trip status and live location to the trip's two parties.
//!
//! Who may hear about a trip is derived from the trip record itself (rider and
//! current captain), so there is no separate subscription table to go stale.
//! Delivery is best-effort and never changes the outcome of the operation that
//! triggered it.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{RideError, RideResult};
use crate::model::{Coordinates, Identity, Trip, TripId, TripStatus};
use crate::protocol::{AvailableTripPayload, ServerEvent};
use crate::registry::ConnectionRegistry;
use crate::spatial::{LocationIndex, NearbyCaptain};
use crate::store::TripStore;

/// Current state handed back to a new subscriber.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripSnapshot {
    pub trip_id: TripId,
    pub status: TripStatus,
    pub captain_location: Option<Coordinates>,
}

pub struct Notifier {
    store: Arc<dyn TripStore>,
    index: Arc<dyn LocationIndex>,
    registry: Arc<ConnectionRegistry>,
}

impl Notifier {
    pub fn new(
        store: Arc<dyn TripStore>,
        index: Arc<dyn LocationIndex>,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            store,
            index,
            registry,
        }
    }

    /// Snapshot for `identity` if it is the trip's rider or current captain.
    pub async fn subscribe(&self, trip_id: TripId, identity: &Identity) -> RideResult<TripSnapshot> {
        let trip = self
            .store
            .trip(trip_id)
            .await?
            .ok_or_else(|| RideError::NotFound(format!("trip {trip_id}")))?;
        if !trip.is_party(identity) {
            return Err(RideError::Unauthorized(format!(
                "{identity} is not a party to trip {trip_id}"
            )));
        }

        let captain_location = match trip.captain_id.as_deref() {
            Some(captain_id) if trip.status != TripStatus::Requested => {
                self.captain_location(captain_id).await
            }
            _ => None,
        };

        debug!(%trip_id, %identity, status = %trip.status, "subscribed");
        Ok(TripSnapshot {
            trip_id,
            status: trip.status,
            captain_location,
        })
    }

    /// `status:update` to the rider and, if assigned, the captain.
    pub fn publish_status(&self, trip: &Trip) {
        let event = ServerEvent::status_update(trip);
        self.registry.send_to(&trip.rider(), event.clone());
        if let Some(captain) = trip.captain() {
            self.registry.send_to(&captain, event);
        }
        debug!(trip_id = %trip.id, status = %trip.status, "status published");
    }

    /// Relays a live position from the trip's captain to its rider.
    pub async fn publish_location(
        &self,
        trip_id: TripId,
        captain: &Identity,
        at: Coordinates,
    ) -> RideResult<()> {
        let trip = self
            .store
            .trip(trip_id)
            .await?
            .ok_or_else(|| RideError::NotFound(format!("trip {trip_id}")))?;
        if !captain.is_captain() || !trip.is_party(captain) {
            return Err(RideError::Unauthorized(format!(
                "{captain} is not the captain of trip {trip_id}"
            )));
        }
        if !trip.status.is_captain_engaged() {
            return Err(RideError::InvalidTransition(format!(
                "trip {trip_id} is {} and not streaming location",
                trip.status
            )));
        }

        self.registry
            .send_to(&trip.rider(), ServerEvent::location_update(trip_id, at));
        Ok(())
    }

    /// `trip:available` to each nearby captain that is pooling and connected.
    /// Returns how many captains were reached.
    pub async fn announce(&self, trip: &Trip, nearby: &[NearbyCaptain]) -> usize {
        let mut reached = 0;
        for candidate in nearby {
            let eligible = match self.store.captain(&candidate.captain_id).await {
                Ok(Some(captain)) => captain.is_eligible(),
                Ok(None) => false,
                Err(err) => {
                    warn!(captain_id = %candidate.captain_id, error = %err, "captain lookup failed");
                    false
                }
            };
            if !eligible {
                continue;
            }
            let event = ServerEvent::TripAvailable(AvailableTripPayload {
                trip_id: trip.id,
                origin: trip.origin.clone(),
                destination: trip.destination.clone(),
                capacity: trip.capacity,
                pricing: trip.pricing,
                pickup_distance_m: candidate.distance_m,
            });
            if self
                .registry
                .send_to(&Identity::captain(candidate.captain_id.clone()), event)
            {
                reached += 1;
            }
        }
        debug!(trip_id = %trip.id, reached, "trip announced");
        reached
    }

    pub(crate) async fn captain_location(&self, captain_id: &str) -> Option<Coordinates> {
        match self.index.location_of(captain_id).await {
            Ok(location) => location,
            Err(err) => {
                warn!(captain_id, error = %err, "location lookup failed");
                None
            }
        }
    }
}
