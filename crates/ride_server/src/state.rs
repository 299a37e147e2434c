use std::sync::Arc;

use ride_core::RideService;

use crate::auth::JwtValidator;

/// Shared across every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RideService>,
    pub auth: Arc<JwtValidator>,
}

impl AppState {
    pub fn new(service: RideService, auth: JwtValidator) -> Self {
        Self {
            service: Arc::new(service),
            auth: Arc::new(auth),
        }
    }
}
