//! Trip and captain records.
//!
//! The store is the only place trip status and captain eligibility change. Every
//! mutating call is one transaction: preconditions are checked and writes applied
//! under the same lock, so two racing claims on a captain (or two racing
//! transitions on a trip) serialize and exactly one observes the precondition.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::model::{Captain, CaptainId, Coordinates, Identity, Role, Trip, TripId, TripStatus};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("trip store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of an atomic captain-to-trip claim.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimOutcome {
    Claimed(Trip),
    TripNotFound,
    /// Trip already left REQUESTED or already has a captain.
    TripUnavailable,
    /// Captain offline, not pooling, or already bound to a trip.
    CaptainUnavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    Applied {
        trip: Trip,
        /// Captain whose `assigned_to_trip` flag was cleared by this step.
        released_captain: Option<CaptainId>,
    },
    NotFound,
    /// Guard or lifecycle edge refused; carries the unchanged row.
    Rejected(Trip),
}

#[async_trait]
pub trait TripStore: Send + Sync {
    async fn insert_trip(&self, trip: Trip) -> StoreResult<Trip>;

    async fn trip(&self, id: TripId) -> StoreResult<Option<Trip>>;

    /// REQUESTED trips without a captain, oldest first.
    async fn open_trips(&self) -> StoreResult<Vec<Trip>>;

    /// Trips where `identity` is the rider or the captain, newest first.
    async fn trips_for(&self, identity: &Identity) -> StoreResult<Vec<Trip>>;

    async fn captain(&self, id: &str) -> StoreResult<Option<Captain>>;

    /// Captain reports for work at `at`. Creates the row on first contact.
    async fn mark_pooling(&self, id: &str, at: Coordinates) -> StoreResult<Captain>;

    /// Clears every eligibility flag. Returns the row if the captain is known.
    async fn force_offline(&self, id: &str) -> StoreResult<Option<Captain>>;

    /// Binds `captain_id` to `trip_id` iff the captain is eligible and the trip is
    /// still open, in one indivisible step.
    async fn claim(&self, trip_id: TripId, captain_id: &str) -> StoreResult<ClaimOutcome>;

    /// Moves the trip to `next` iff the edge is legal and `guard` accepts the current
    /// row. Entering a terminal status releases the assigned captain.
    async fn transition(
        &self,
        trip_id: TripId,
        next: TripStatus,
        guard: &(dyn for<'t> Fn(&'t Trip) -> bool + Send + Sync),
    ) -> StoreResult<TransitionOutcome>;
}

#[derive(Debug, Default)]
struct Tables {
    trips: HashMap<TripId, Trip>,
    captains: HashMap<CaptainId, Captain>,
    /// Non-terminal trip each captain is bound to.
    active_trip_by_captain: HashMap<CaptainId, TripId>,
}

/// Process-local store. One lock spans trips and captains so claims are transactions.
#[derive(Debug, Default)]
pub struct InMemoryTripStore {
    tables: Mutex<Tables>,
}

impl InMemoryTripStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("table lock poisoned".into()))
    }
}

#[async_trait]
impl TripStore for InMemoryTripStore {
    async fn insert_trip(&self, trip: Trip) -> StoreResult<Trip> {
        let mut tables = self.lock()?;
        tables.trips.insert(trip.id, trip.clone());
        Ok(trip)
    }

    async fn trip(&self, id: TripId) -> StoreResult<Option<Trip>> {
        Ok(self.lock()?.trips.get(&id).cloned())
    }

    async fn open_trips(&self) -> StoreResult<Vec<Trip>> {
        let tables = self.lock()?;
        let mut trips: Vec<Trip> = tables.trips.values().filter(|t| t.is_open()).cloned().collect();
        trips.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(trips)
    }

    async fn trips_for(&self, identity: &Identity) -> StoreResult<Vec<Trip>> {
        let tables = self.lock()?;
        let mut trips: Vec<Trip> = tables
            .trips
            .values()
            .filter(|trip| match identity.role {
                Role::Rider => trip.rider_id == identity.id,
                Role::Captain => trip.captain_id.as_deref() == Some(identity.id.as_str()),
            })
            .cloned()
            .collect();
        trips.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(trips)
    }

    async fn captain(&self, id: &str) -> StoreResult<Option<Captain>> {
        Ok(self.lock()?.captains.get(id).cloned())
    }

    async fn mark_pooling(&self, id: &str, at: Coordinates) -> StoreResult<Captain> {
        let mut tables = self.lock()?;
        let bound = tables.active_trip_by_captain.contains_key(id);
        let captain = tables
            .captains
            .entry(id.to_string())
            .or_insert_with(|| Captain::offline(id));
        captain.online = true;
        captain.last_location = Some(at);
        // A captain still bound to a trip (e.g. after a reconnect) keeps the binding.
        captain.assigned_to_trip = bound;
        captain.pooling_for_work = !bound;
        Ok(captain.clone())
    }

    async fn force_offline(&self, id: &str) -> StoreResult<Option<Captain>> {
        let mut tables = self.lock()?;
        Ok(tables.captains.get_mut(id).map(|captain| {
            captain.online = false;
            captain.pooling_for_work = false;
            captain.assigned_to_trip = false;
            captain.clone()
        }))
    }

    async fn claim(&self, trip_id: TripId, captain_id: &str) -> StoreResult<ClaimOutcome> {
        let mut guard = self.lock()?;
        let tables = &mut *guard;

        let Some(trip) = tables.trips.get_mut(&trip_id) else {
            return Ok(ClaimOutcome::TripNotFound);
        };
        if !trip.is_open() {
            return Ok(ClaimOutcome::TripUnavailable);
        }
        let eligible = tables
            .captains
            .get(captain_id)
            .is_some_and(Captain::is_eligible)
            && !tables.active_trip_by_captain.contains_key(captain_id);
        if !eligible {
            return Ok(ClaimOutcome::CaptainUnavailable);
        }

        trip.status = TripStatus::Accepted;
        trip.captain_id = Some(captain_id.to_string());
        trip.updated_at = Utc::now();
        let claimed = trip.clone();

        if let Some(captain) = tables.captains.get_mut(captain_id) {
            captain.pooling_for_work = false;
            captain.assigned_to_trip = true;
        }
        tables
            .active_trip_by_captain
            .insert(captain_id.to_string(), trip_id);

        debug!(trip_id = %trip_id, captain_id, "claim committed");
        Ok(ClaimOutcome::Claimed(claimed))
    }

    async fn transition(
        &self,
        trip_id: TripId,
        next: TripStatus,
        guard: &(dyn for<'t> Fn(&'t Trip) -> bool + Send + Sync),
    ) -> StoreResult<TransitionOutcome> {
        let mut lock = self.lock()?;
        let tables = &mut *lock;

        let Some(trip) = tables.trips.get_mut(&trip_id) else {
            return Ok(TransitionOutcome::NotFound);
        };
        if !trip.status.can_transition_to(next) || !guard(&*trip) {
            return Ok(TransitionOutcome::Rejected(trip.clone()));
        }

        trip.status = next;
        trip.updated_at = Utc::now();
        let updated = trip.clone();

        let mut released_captain = None;
        if next.is_terminal() {
            if let Some(captain_id) = updated.captain_id.as_deref() {
                if tables.active_trip_by_captain.get(captain_id) == Some(&trip_id) {
                    tables.active_trip_by_captain.remove(captain_id);
                }
                if let Some(captain) = tables.captains.get_mut(captain_id) {
                    captain.assigned_to_trip = false;
                }
                released_captain = Some(captain_id.to_string());
            }
        }

        Ok(TransitionOutcome::Applied {
            trip: updated,
            released_captain,
        })
    }
}
