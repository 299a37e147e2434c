use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use ride_core::matching::TripTicket;
use ride_core::model::{Role, Trip, TripRequest};

use crate::auth::Caller;
use crate::error::ApiError;
use crate::state::AppState;

/// POST /rider/trips
pub async fn request_trip(
    State(state): State<AppState>,
    Caller(rider): Caller,
    Json(request): Json<TripRequest>,
) -> Result<(StatusCode, Json<TripTicket>), ApiError> {
    let ticket = state.service.request_trip(&rider, request).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// GET /rider/trips
pub async fn history(
    State(state): State<AppState>,
    Caller(rider): Caller,
) -> Result<Json<Vec<Trip>>, ApiError> {
    rider.require(Role::Rider)?;
    Ok(Json(state.service.trip_history(&rider).await?))
}
