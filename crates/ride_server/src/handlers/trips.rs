use axum::extract::{Path, State};
use axum::Json;
use ride_core::service::TripDetail;
use serde::Serialize;

use super::captain::TransitionResponse;
use super::trip_id;
use crate::auth::Caller;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub connections: usize,
    pub version: &'static str,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        connections: state.service.registry().connection_count(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /trips/{id}, for clients polling instead of holding a channel.
pub async fn detail(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: Path<String>,
) -> Result<Json<TripDetail>, ApiError> {
    Ok(Json(state.service.trip_detail(trip_id(path)?, &caller).await?))
}

/// POST /trips/{id}/cancel
pub async fn cancel_trip(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: Path<String>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let trip = state.service.cancel_trip(trip_id(path)?, &caller).await?;
    Ok(Json(trip.into()))
}
