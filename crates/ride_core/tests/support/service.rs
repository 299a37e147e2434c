use std::sync::Arc;

use ride_core::config::{DispatchConfig, ServiceConfig};
use ride_core::matching::NearestFirst;
use ride_core::model::{Coordinates, Identity};
use ride_core::service::{Connection, RideService};
use ride_core::spatial::LocationIndex;
use ride_core::store::InMemoryTripStore;

/// Builder for services wired the way tests need them.
#[derive(Clone, Debug)]
pub struct TestServiceBuilder {
    config: ServiceConfig,
}

impl Default for TestServiceBuilder {
    fn default() -> Self {
        Self {
            config: ServiceConfig {
                dispatch: DispatchConfig {
                    auto_dispatch: false,
                    ..DispatchConfig::default()
                },
                ..ServiceConfig::default()
            },
        }
    }
}

impl TestServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_auto_dispatch(mut self, enabled: bool) -> Self {
        self.config.dispatch.auto_dispatch = enabled;
        self
    }

    pub fn with_match_radius_m(mut self, radius_m: f64) -> Self {
        self.config.dispatch.match_radius_m = radius_m;
        self
    }

    pub fn build(self) -> Arc<RideService> {
        Arc::new(RideService::in_memory(self.config))
    }

    /// In-memory store with a caller-supplied index.
    pub fn build_with_index(self, index: Arc<dyn LocationIndex>) -> Arc<RideService> {
        Arc::new(RideService::with_backends(
            Arc::new(InMemoryTripStore::new()),
            index,
            Box::new(NearestFirst),
            self.config,
        ))
    }
}

/// Connects `captain` and reports them pooling at `at`.
pub async fn pooling_captain(service: &RideService, captain: &str, at: Coordinates) -> Connection {
    let identity = Identity::captain(captain);
    let connection = service.connect(identity.clone());
    service
        .report_location(&identity, at)
        .await
        .expect("pooling report");
    connection
}
