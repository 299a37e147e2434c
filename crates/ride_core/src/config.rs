use h3o::Resolution;

use crate::pricing::PricingConfig;

/// Default search radius around a trip origin when looking for captains.
pub const DEFAULT_MATCH_RADIUS_M: f64 = 2_000.0;

/// Default cap on index candidates tried per match attempt.
pub const DEFAULT_MAX_CANDIDATES: usize = 10;

/// Matching behavior for the dispatcher.
#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    /// Radius in meters around the pickup point searched for captains.
    pub match_radius_m: f64,
    /// Maximum number of nearest captains a single attempt tries to claim.
    pub max_candidates: usize,
    /// When true, a match attempt is spawned as soon as a trip is created.
    /// When false, trips wait for a manual accept or an explicit `attempt_match`.
    pub auto_dispatch: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            match_radius_m: DEFAULT_MATCH_RADIUS_M,
            max_candidates: DEFAULT_MAX_CANDIDATES,
            auto_dispatch: true,
        }
    }
}

/// H3 bucketing for the location index.
#[derive(Debug, Clone, Copy)]
pub struct IndexConfig {
    /// Cell resolution used to bucket captain positions. 9 is roughly 174m edges.
    pub resolution: Resolution,
    /// Grid disks kept in the LRU cache, keyed by (origin cell, k).
    pub disk_cache_size: usize,
    /// Largest grid disk radius (in rings) walked before falling back to a full scan.
    pub max_disk_rings: u32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::Nine,
            disk_cache_size: 1_000,
            max_disk_rings: 32,
        }
    }
}

/// Everything needed to assemble a [`crate::service::RideService`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceConfig {
    pub dispatch: DispatchConfig,
    pub pricing: PricingConfig,
    pub index: IndexConfig,
}
