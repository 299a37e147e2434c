use std::cmp::Ordering;

use crate::model::Trip;
use crate::spatial::NearbyCaptain;

use super::algorithm::MatchingAlgorithm;
use super::types::MatchCandidate;

/// Nearest captain first, ties broken by captain id.
///
/// The score is the great-circle pickup distance in meters, so the ranking is
/// stable for a given set of positions regardless of the order the index
/// returned them in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NearestFirst;

impl MatchingAlgorithm for NearestFirst {
    fn rank(&self, _trip: &Trip, nearby: Vec<NearbyCaptain>) -> Vec<MatchCandidate> {
        let mut candidates: Vec<MatchCandidate> = nearby
            .into_iter()
            .map(|captain| MatchCandidate {
                score: captain.distance_m,
                pickup_distance_m: captain.distance_m,
                captain_id: captain.captain_id,
            })
            .collect();
        candidates.sort_by(|a, b| match a.score.total_cmp(&b.score) {
            Ordering::Equal => a.captain_id.cmp(&b.captain_id),
            other => other,
        });
        candidates
    }
}
