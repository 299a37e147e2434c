use crate::model::Trip;
use crate::spatial::NearbyCaptain;

use super::types::MatchCandidate;

/// Orders nearby captains into the sequence the dispatcher tries to claim.
///
/// Ranking never checks availability; the claim does that atomically.
pub trait MatchingAlgorithm: Send + Sync {
    fn rank(&self, trip: &Trip, nearby: Vec<NearbyCaptain>) -> Vec<MatchCandidate>;
}
