//! Trip state machine driven by the trip's parties.
//!
//! ```text
//! REQUESTED -> ACCEPTED -> ON_TRIP -> COMPLETED
//!     |            |
//!     +------------+--> CANCELLED
//! ```
//!
//! Every step is a single guarded store transition; the guard carries the
//! actor and OTP checks so they are evaluated against the same row that gets
//! written. Status is published to both parties before the call returns.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{RideError, RideResult};
use crate::model::{Identity, Role, Trip, TripId, TripStatus};
use crate::notify::Notifier;
use crate::otp::otp_matches;
use crate::store::{ClaimOutcome, TransitionOutcome, TripStore};

/// Single message for every failed pickup, so callers cannot probe which check failed.
const PICKUP_REJECTED: &str = "invalid trip or OTP";

pub struct TripLifecycle {
    store: Arc<dyn TripStore>,
    notifier: Arc<Notifier>,
}

impl TripLifecycle {
    pub fn new(store: Arc<dyn TripStore>, notifier: Arc<Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Captain takes a REQUESTED trip, racing any concurrent accept or match.
    pub async fn accept_manually(&self, trip_id: TripId, captain: &Identity) -> RideResult<Trip> {
        captain.require(Role::Captain)?;
        match self.store.claim(trip_id, &captain.id).await? {
            ClaimOutcome::Claimed(trip) => {
                info!(%trip_id, captain_id = %captain.id, "trip accepted");
                self.notifier.publish_status(&trip);
                Ok(trip)
            }
            ClaimOutcome::TripNotFound => Err(RideError::NotFound(format!("trip {trip_id}"))),
            ClaimOutcome::TripUnavailable => Err(RideError::NotAvailable),
            ClaimOutcome::CaptainUnavailable => {
                debug!(%trip_id, captain_id = %captain.id, "captain not eligible to accept");
                Err(RideError::NotAvailable)
            }
        }
    }

    /// ACCEPTED -> ON_TRIP when the assigned captain presents the rider's code.
    pub async fn verify_pickup(
        &self,
        trip_id: TripId,
        captain: &Identity,
        otp: &str,
    ) -> RideResult<Trip> {
        if !captain.is_captain() {
            return Err(RideError::InvalidTransition(PICKUP_REJECTED.into()));
        }
        let guard = |trip: &Trip| {
            trip.status == TripStatus::Accepted
                && trip.is_party(captain)
                && otp_matches(&trip.otp, otp)
        };
        match self
            .store
            .transition(trip_id, TripStatus::OnTrip, &guard)
            .await?
        {
            TransitionOutcome::Applied { trip, .. } => {
                info!(%trip_id, captain_id = %captain.id, "pickup verified");
                self.notifier.publish_status(&trip);
                Ok(trip)
            }
            TransitionOutcome::NotFound | TransitionOutcome::Rejected(_) => {
                warn!(%trip_id, captain_id = %captain.id, "pickup rejected");
                Err(RideError::InvalidTransition(PICKUP_REJECTED.into()))
            }
        }
    }

    /// ON_TRIP -> COMPLETED. Releases the captain without re-pooling them.
    pub async fn complete(&self, trip_id: TripId, captain: &Identity) -> RideResult<Trip> {
        captain.require(Role::Captain)?;
        let guard = |trip: &Trip| trip.is_party(captain);
        match self
            .store
            .transition(trip_id, TripStatus::Completed, &guard)
            .await?
        {
            TransitionOutcome::Applied { trip, .. } => {
                info!(%trip_id, captain_id = %captain.id, "trip completed");
                self.notifier.publish_status(&trip);
                Ok(trip)
            }
            TransitionOutcome::NotFound => Err(RideError::NotFound(format!("trip {trip_id}"))),
            TransitionOutcome::Rejected(trip) if !trip.is_party(captain) => Err(
                RideError::Unauthorized(format!("{captain} is not the captain of trip {trip_id}")),
            ),
            TransitionOutcome::Rejected(trip) => Err(RideError::InvalidTransition(format!(
                "cannot complete a trip in {}",
                trip.status
            ))),
        }
    }

    /// REQUESTED or ACCEPTED -> CANCELLED by the rider who owns the trip or the
    /// captain assigned to it.
    pub async fn cancel(&self, trip_id: TripId, actor: &Identity) -> RideResult<Trip> {
        let guard = |trip: &Trip| trip.is_party(actor);
        match self
            .store
            .transition(trip_id, TripStatus::Cancelled, &guard)
            .await?
        {
            TransitionOutcome::Applied {
                trip,
                released_captain,
            } => {
                info!(
                    %trip_id,
                    actor = %actor,
                    released_captain = released_captain.as_deref().unwrap_or("-"),
                    "trip cancelled"
                );
                self.notifier.publish_status(&trip);
                Ok(trip)
            }
            TransitionOutcome::NotFound => Err(RideError::NotFound(format!("trip {trip_id}"))),
            TransitionOutcome::Rejected(trip) if !trip.is_party(actor) => Err(
                RideError::Unauthorized(format!("{actor} cannot cancel trip {trip_id}")),
            ),
            TransitionOutcome::Rejected(trip) => Err(RideError::InvalidTransition(format!(
                "cannot cancel a trip in {}",
                trip.status
            ))),
        }
    }

    /// Connection loss takes a captain out of the pool. An active trip is left
    /// as is; the captain's binding survives a reconnect.
    pub async fn captain_disconnected(&self, captain_id: &str) -> RideResult<()> {
        if let Some(captain) = self.store.force_offline(captain_id).await? {
            info!(captain_id, had_location = captain.last_location.is_some(), "captain offline");
        }
        Ok(())
    }
}
