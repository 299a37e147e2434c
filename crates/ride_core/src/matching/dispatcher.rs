use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::DispatchConfig;
use crate::error::{RideError, RideResult};
use crate::model::{Identity, Role, Trip, TripId, TripRequest};
use crate::notify::Notifier;
use crate::otp::generate_otp;
use crate::pricing::{calculate_trip_fare, PricingConfig};
use crate::spatial::{LocationIndex, NearbyCaptain};
use crate::store::{ClaimOutcome, TripStore};

use super::algorithm::MatchingAlgorithm;
use super::types::MatchResult;

/// What the rider gets back from a trip request. The OTP is shown only here.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripTicket {
    pub trip_id: TripId,
    pub otp: String,
}

/// Creates trips and binds them to nearby captains.
pub struct Dispatcher {
    store: Arc<dyn TripStore>,
    index: Arc<dyn LocationIndex>,
    notifier: Arc<Notifier>,
    algorithm: Box<dyn MatchingAlgorithm>,
    config: DispatchConfig,
    pricing: PricingConfig,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn TripStore>,
        index: Arc<dyn LocationIndex>,
        notifier: Arc<Notifier>,
        algorithm: Box<dyn MatchingAlgorithm>,
        config: DispatchConfig,
        pricing: PricingConfig,
    ) -> Self {
        Self {
            store,
            index,
            notifier,
            algorithm,
            config,
            pricing,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Persists a REQUESTED trip and returns immediately; matching and the
    /// `trip:available` broadcast run on a spawned task.
    pub async fn request_trip(
        self: &Arc<Self>,
        rider: &Identity,
        request: TripRequest,
    ) -> RideResult<TripTicket> {
        rider.require(Role::Rider)?;
        request.validate()?;

        let fare = calculate_trip_fare(
            request.origin.coordinates(),
            request.destination.coordinates(),
            request.capacity,
            &self.pricing,
        );
        let otp = generate_otp(&mut rand::thread_rng());
        let trip = self
            .store
            .insert_trip(Trip::requested(rider.id.clone(), request, fare, otp))
            .await?;
        info!(
            trip_id = %trip.id,
            rider_id = %trip.rider_id,
            capacity = trip.capacity,
            pricing = trip.pricing,
            "trip requested"
        );

        let ticket = TripTicket {
            trip_id: trip.id,
            otp: trip.otp.clone(),
        };
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move { dispatcher.dispatch_new_trip(trip).await });
        Ok(ticket)
    }

    /// One matching pass over nearby captains, nearest first, stopping at the
    /// first successful claim. `Ok(None)` leaves the trip REQUESTED.
    pub async fn attempt_match(&self, trip_id: TripId) -> RideResult<Option<MatchResult>> {
        let trip = self
            .store
            .trip(trip_id)
            .await?
            .ok_or_else(|| RideError::NotFound(format!("trip {trip_id}")))?;
        if !trip.is_open() {
            debug!(%trip_id, status = %trip.status, "trip no longer open, skipping match");
            return Ok(None);
        }

        let nearby = self.nearby_captains(&trip).await;
        let candidates = self.algorithm.rank(&trip, nearby);
        debug!(%trip_id, candidates = candidates.len(), "match attempt");

        for (attempt, candidate) in candidates.into_iter().enumerate() {
            match self.store.claim(trip_id, &candidate.captain_id).await? {
                ClaimOutcome::Claimed(accepted) => {
                    info!(
                        %trip_id,
                        captain_id = %candidate.captain_id,
                        pickup_distance_m = candidate.pickup_distance_m,
                        "trip matched"
                    );
                    self.notifier.publish_status(&accepted);
                    return Ok(Some(MatchResult {
                        trip_id,
                        captain_id: candidate.captain_id,
                        pickup_distance_m: candidate.pickup_distance_m,
                        attempts: attempt + 1,
                    }));
                }
                ClaimOutcome::CaptainUnavailable => {
                    debug!(%trip_id, captain_id = %candidate.captain_id, "captain unavailable");
                }
                ClaimOutcome::TripUnavailable | ClaimOutcome::TripNotFound => {
                    debug!(%trip_id, "trip taken while matching");
                    return Ok(None);
                }
            }
        }

        info!(%trip_id, "no captain matched, trip stays requested");
        Ok(None)
    }

    /// Index candidates around the pickup. Index faults count as "nobody nearby".
    async fn nearby_captains(&self, trip: &Trip) -> Vec<NearbyCaptain> {
        match self
            .index
            .query_nearby(
                trip.origin.coordinates(),
                self.config.match_radius_m,
                self.config.max_candidates,
            )
            .await
        {
            Ok(nearby) => nearby,
            Err(err) => {
                warn!(trip_id = %trip.id, error = %err, "location index query failed");
                Vec::new()
            }
        }
    }

    async fn dispatch_new_trip(&self, trip: Trip) {
        if self.config.auto_dispatch {
            match self.attempt_match(trip.id).await {
                Ok(Some(_)) => return,
                Ok(None) => {}
                Err(err) => {
                    warn!(trip_id = %trip.id, error = %err, "match attempt failed");
                    return;
                }
            }
        }

        // Re-read: a manual accept may have landed while matching ran.
        match self.store.trip(trip.id).await {
            Ok(Some(current)) if current.is_open() => {
                let nearby = self.nearby_captains(&current).await;
                self.notifier.announce(&current, &nearby).await;
            }
            Ok(_) => {}
            Err(err) => warn!(trip_id = %trip.id, error = %err, "trip reload failed"),
        }
    }
}
