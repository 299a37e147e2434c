use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::handlers::{captain, realtime, rider, trips};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(trips::health))
        .route("/rider/trips", post(rider::request_trip).get(rider::history))
        .route("/captain/trips", get(captain::history))
        .route("/captain/trips/available", get(captain::available_trips))
        .route("/captain/trips/{id}/accept", post(captain::accept_trip))
        .route("/captain/trips/{id}/pickup", post(captain::verify_pickup))
        .route("/captain/trips/{id}/complete", post(captain::complete_trip))
        .route("/captain/location", post(captain::report_location))
        .route("/trips/{id}", get(trips::detail))
        .route("/trips/{id}/cancel", post(trips::cancel_trip))
        .route("/realtime", get(realtime::upgrade))
        .layer(cors)
        .with_state(state)
}
