use crate::model::{CaptainId, TripId};

/// A captain considered for a trip, in the order claims will be attempted.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub captain_id: CaptainId,
    pub pickup_distance_m: f64,
    /// Lower is better.
    pub score: f64,
}

/// A committed captain-to-trip binding.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub trip_id: TripId,
    pub captain_id: CaptainId,
    pub pickup_distance_m: f64,
    /// Claims tried before this one succeeded, including it.
    pub attempts: usize,
}
