//! Spatial operations: H3-bucketed captain positions and proximity queries.
//!
//! This module provides:
//!
//! - **LocationIndex**: the async seam dispatch and fan-out talk to
//! - **H3LocationIndex**: in-process implementation, captains bucketed by H3 cell
//! - **Grid disk cache**: LRU of `(cell, k)` disks reused across queries
//! - **Distance calculations**: haversine distance between coordinates
//!
//! Default resolution is 9 (~174m edges), suitable for city-scale dispatch.
//! Cells only prune candidates; ordering and radius filtering use exact distances.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use h3o::{CellIndex, LatLng, Resolution};
use lru::LruCache;

use crate::config::IndexConfig;
use crate::model::{CaptainId, Coordinates};

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    #[error("location index unavailable: {0}")]
    Unavailable(String),

    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(String),
}

/// One query hit: who, where they were last seen, and how far from the query point.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyCaptain {
    pub captain_id: CaptainId,
    pub location: Coordinates,
    pub distance_m: f64,
}

/// Last-known captain positions. Never consults availability; callers re-check it.
#[async_trait]
pub trait LocationIndex: Send + Sync {
    /// Overwrite the captain's position. Last write wins.
    async fn upsert_location(&self, captain_id: &str, at: Coordinates) -> Result<(), IndexError>;

    /// Captains within `radius_m` of `at`, nearest first, ties by id, at most `limit`.
    async fn query_nearby(
        &self,
        at: Coordinates,
        radius_m: f64,
        limit: usize,
    ) -> Result<Vec<NearbyCaptain>, IndexError>;

    async fn location_of(&self, captain_id: &str) -> Result<Option<Coordinates>, IndexError>;

    /// Forget the captain. Returns whether a position was held.
    async fn remove_location(&self, captain_id: &str) -> Result<bool, IndexError>;
}

/// Great-circle distance in meters.
pub fn haversine_m(a: Coordinates, b: Coordinates) -> f64 {
    let (lat1, lon1) = (a.lat.to_radians(), a.lng.to_radians());
    let (lat2, lon2) = (b.lat.to_radians(), b.lng.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlon = (dlon * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

fn cell_for(at: Coordinates, resolution: Resolution) -> Result<CellIndex, IndexError> {
    at.validate()
        .map_err(|err| IndexError::InvalidCoordinates(err.to_string()))?;
    LatLng::new(at.lat, at.lng)
        .map(|ll| ll.to_cell(resolution))
        .map_err(|err| IndexError::InvalidCoordinates(err.to_string()))
}

/// Grid disk cache for repeated pickup-area queries.
struct GridDiskCache {
    cache: Mutex<LruCache<(CellIndex, u32), Vec<CellIndex>>>,
}

impl GridDiskCache {
    fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn get_or_compute(&self, origin: CellIndex, k: u32) -> Vec<CellIndex> {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(_) => return origin.grid_disk::<Vec<_>>(k), // Fallback: compute without cache if mutex poisoned
        };
        cache
            .get_or_insert((origin, k), || origin.grid_disk::<Vec<_>>(k))
            .clone()
    }
}

/// Cell → captain mappings plus the reverse lookup used for moves.
#[derive(Debug, Default)]
struct Buckets {
    captains_by_cell: HashMap<CellIndex, Vec<CaptainId>>,
    positions: HashMap<CaptainId, (CellIndex, Coordinates)>,
}

impl Buckets {
    fn upsert(&mut self, captain_id: &str, cell: CellIndex, at: Coordinates) {
        match self.positions.get(captain_id).map(|(old, _)| *old) {
            Some(old_cell) if old_cell == cell => {}
            Some(old_cell) => {
                self.remove_from_cell(old_cell, captain_id);
                self.captains_by_cell
                    .entry(cell)
                    .or_default()
                    .push(captain_id.to_string());
            }
            None => {
                self.captains_by_cell
                    .entry(cell)
                    .or_default()
                    .push(captain_id.to_string());
            }
        }
        self.positions.insert(captain_id.to_string(), (cell, at));
    }

    fn remove(&mut self, captain_id: &str) -> bool {
        match self.positions.remove(captain_id) {
            Some((cell, _)) => {
                self.remove_from_cell(cell, captain_id);
                true
            }
            None => false,
        }
    }

    fn remove_from_cell(&mut self, cell: CellIndex, captain_id: &str) {
        if let Some(ids) = self.captains_by_cell.get_mut(&cell) {
            ids.retain(|id| id != captain_id);
            if ids.is_empty() {
                self.captains_by_cell.remove(&cell);
            }
        }
    }

    fn captains_in_cells(&self, cells: &[CellIndex]) -> Vec<(&CaptainId, Coordinates)> {
        let mut result = Vec::new();
        for cell in cells {
            if let Some(ids) = self.captains_by_cell.get(cell) {
                for id in ids {
                    if let Some((_, at)) = self.positions.get(id) {
                        result.push((id, *at));
                    }
                }
            }
        }
        result
    }

    fn all_captains(&self) -> Vec<(&CaptainId, Coordinates)> {
        self.positions.iter().map(|(id, (_, at))| (id, *at)).collect()
    }
}

/// In-process location index.
///
/// Writes take the bucket lock for one captain at a time; queries take a read lock,
/// so concurrent reports from different captains never block each other for long.
pub struct H3LocationIndex {
    config: IndexConfig,
    buckets: RwLock<Buckets>,
    disks: GridDiskCache,
}

impl H3LocationIndex {
    pub fn new(config: IndexConfig) -> Self {
        Self {
            disks: GridDiskCache::new(config.disk_cache_size),
            buckets: RwLock::new(Buckets::default()),
            config,
        }
    }

    /// Rings needed so every point within `radius_m` lands in the disk.
    ///
    /// Adjacent centers are at least ~1.5 edges apart even with projection
    /// distortion, so one ring per average edge plus two rings of slack covers
    /// the radius and the cell the query point sits in.
    pub fn rings_for_radius(&self, radius_m: f64) -> u32 {
        let edge_m = self.config.resolution.edge_length_m();
        let rings = (radius_m.max(0.0) / edge_m).ceil();
        if rings >= f64::from(u32::MAX - 2) {
            u32::MAX
        } else {
            rings as u32 + 2
        }
    }

    pub fn len(&self) -> usize {
        self.buckets
            .read()
            .map(|buckets| buckets.positions.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for H3LocationIndex {
    fn default() -> Self {
        Self::new(IndexConfig::default())
    }
}

#[async_trait]
impl LocationIndex for H3LocationIndex {
    async fn upsert_location(&self, captain_id: &str, at: Coordinates) -> Result<(), IndexError> {
        let cell = cell_for(at, self.config.resolution)?;
        let mut buckets = self
            .buckets
            .write()
            .map_err(|_| IndexError::Unavailable("bucket lock poisoned".into()))?;
        buckets.upsert(captain_id, cell, at);
        Ok(())
    }

    async fn query_nearby(
        &self,
        at: Coordinates,
        radius_m: f64,
        limit: usize,
    ) -> Result<Vec<NearbyCaptain>, IndexError> {
        if limit == 0 || radius_m.is_nan() || radius_m < 0.0 {
            return Ok(Vec::new());
        }
        let origin = cell_for(at, self.config.resolution)?;
        let rings = self.rings_for_radius(radius_m);

        let buckets = self
            .buckets
            .read()
            .map_err(|_| IndexError::Unavailable("bucket lock poisoned".into()))?;
        let candidates = if rings > self.config.max_disk_rings {
            buckets.all_captains()
        } else {
            let cells = self.disks.get_or_compute(origin, rings);
            buckets.captains_in_cells(&cells)
        };

        let mut hits: Vec<NearbyCaptain> = candidates
            .into_iter()
            .filter_map(|(id, location)| {
                let distance_m = haversine_m(at, location);
                (distance_m <= radius_m).then(|| NearbyCaptain {
                    captain_id: id.clone(),
                    location,
                    distance_m,
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            a.distance_m
                .total_cmp(&b.distance_m)
                .then_with(|| a.captain_id.cmp(&b.captain_id))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn location_of(&self, captain_id: &str) -> Result<Option<Coordinates>, IndexError> {
        let buckets = self
            .buckets
            .read()
            .map_err(|_| IndexError::Unavailable("bucket lock poisoned".into()))?;
        Ok(buckets.positions.get(captain_id).map(|(_, at)| *at))
    }

    async fn remove_location(&self, captain_id: &str) -> Result<bool, IndexError> {
        let mut buckets = self
            .buckets
            .write()
            .map_err(|_| IndexError::Unavailable("bucket lock poisoned".into()))?;
        Ok(buckets.remove(captain_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::offset_north;

    fn origin() -> Coordinates {
        Coordinates::new(12.9716, 77.5946)
    }

    #[tokio::test]
    async fn nearby_orders_by_distance_then_id() {
        let index = H3LocationIndex::default();
        index
            .upsert_location("far", offset_north(origin(), 900.0))
            .await
            .expect("upsert");
        index
            .upsert_location("b-near", offset_north(origin(), 100.0))
            .await
            .expect("upsert");
        index
            .upsert_location("a-near", offset_north(origin(), 100.0))
            .await
            .expect("upsert");

        let hits = index
            .query_nearby(origin(), 1_000.0, 10)
            .await
            .expect("query");
        let ids: Vec<_> = hits.iter().map(|hit| hit.captain_id.as_str()).collect();
        assert_eq!(ids, vec!["a-near", "b-near", "far"]);
    }

    #[tokio::test]
    async fn removed_captain_drops_out_of_queries() {
        let index = H3LocationIndex::default();
        index
            .upsert_location("c1", offset_north(origin(), 100.0))
            .await
            .expect("upsert");
        index
            .upsert_location("c2", offset_north(origin(), 200.0))
            .await
            .expect("upsert");

        assert!(index.remove_location("c1").await.expect("remove"));
        assert!(!index.remove_location("c1").await.expect("remove again"));
        assert_eq!(index.location_of("c1").await.expect("lookup"), None);
        assert_eq!(index.len(), 1);

        let hits = index
            .query_nearby(origin(), 1_000.0, 10)
            .await
            .expect("query");
        let ids: Vec<_> = hits.iter().map(|hit| hit.captain_id.as_str()).collect();
        assert_eq!(ids, vec!["c2"]);
    }

    #[tokio::test]
    async fn nearby_respects_radius_and_limit() {
        let index = H3LocationIndex::default();
        for (id, meters) in [("c1", 50.0), ("c2", 400.0), ("c3", 1_500.0)] {
            index
                .upsert_location(id, offset_north(origin(), meters))
                .await
                .expect("upsert");
        }

        let within = index
            .query_nearby(origin(), 1_000.0, 10)
            .await
            .expect("query");
        assert_eq!(within.len(), 2);

        let capped = index
            .query_nearby(origin(), 5_000.0, 1)
            .await
            .expect("query");
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].captain_id, "c1");
    }

    #[tokio::test]
    async fn upsert_moves_captain_between_cells() {
        let index = H3LocationIndex::default();
        index
            .upsert_location("mover", offset_north(origin(), 20_000.0))
            .await
            .expect("upsert");
        assert!(index
            .query_nearby(origin(), 500.0, 5)
            .await
            .expect("query")
            .is_empty());

        index
            .upsert_location("mover", offset_north(origin(), 10.0))
            .await
            .expect("upsert");
        let hits = index.query_nearby(origin(), 500.0, 5).await.expect("query");
        assert_eq!(hits.len(), 1);
        assert_eq!(index.len(), 1);
        assert_eq!(
            index.location_of("mover").await.expect("lookup"),
            Some(offset_north(origin(), 10.0))
        );
    }

    #[tokio::test]
    async fn wide_radius_falls_back_to_full_scan() {
        let index = H3LocationIndex::default();
        index
            .upsert_location("distant", offset_north(origin(), 40_000.0))
            .await
            .expect("upsert");
        assert!(index.rings_for_radius(50_000.0) > IndexConfig::default().max_disk_rings);

        let hits = index
            .query_nearby(origin(), 50_000.0, 5)
            .await
            .expect("query");
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn rejects_invalid_coordinates() {
        let index = H3LocationIndex::default();
        let err = index
            .upsert_location("bad", Coordinates::new(120.0, 0.0))
            .await
            .expect_err("latitude out of range");
        assert!(matches!(err, IndexError::InvalidCoordinates(_)));
    }

    #[test]
    fn haversine_matches_offset_fixture() {
        let moved = offset_north(origin(), 500.0);
        assert!((haversine_m(origin(), moved) - 500.0).abs() < 0.5);
    }
}
