use axum::extract::{Path, State};
use axum::Json;
use ride_core::model::{Captain, Coordinates, Role, Trip, TripId, TripStatus};
use serde::{Deserialize, Serialize};

use super::trip_id;
use crate::auth::Caller;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptResponse {
    pub trip_id: TripId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionResponse {
    pub trip_id: TripId,
    pub status: TripStatus,
}

impl From<Trip> for TransitionResponse {
    fn from(trip: Trip) -> Self {
        Self {
            trip_id: trip.id,
            status: trip.status,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PickupRequest {
    pub otp: String,
}

/// POST /captain/trips/{id}/accept
pub async fn accept_trip(
    State(state): State<AppState>,
    Caller(captain): Caller,
    path: Path<String>,
) -> Result<Json<AcceptResponse>, ApiError> {
    let trip = state.service.accept_trip(trip_id(path)?, &captain).await?;
    Ok(Json(AcceptResponse { trip_id: trip.id }))
}

/// POST /captain/trips/{id}/pickup
pub async fn verify_pickup(
    State(state): State<AppState>,
    Caller(captain): Caller,
    path: Path<String>,
    Json(body): Json<PickupRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let trip = state
        .service
        .verify_pickup(trip_id(path)?, &captain, &body.otp)
        .await?;
    Ok(Json(trip.into()))
}

/// POST /captain/trips/{id}/complete
pub async fn complete_trip(
    State(state): State<AppState>,
    Caller(captain): Caller,
    path: Path<String>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let trip = state.service.complete_trip(trip_id(path)?, &captain).await?;
    Ok(Json(trip.into()))
}

/// GET /captain/trips/available
pub async fn available_trips(
    State(state): State<AppState>,
    Caller(captain): Caller,
) -> Result<Json<Vec<Trip>>, ApiError> {
    Ok(Json(state.service.list_available_trips(&captain).await?))
}

/// GET /captain/trips
pub async fn history(
    State(state): State<AppState>,
    Caller(captain): Caller,
) -> Result<Json<Vec<Trip>>, ApiError> {
    captain.require(Role::Captain)?;
    Ok(Json(state.service.trip_history(&captain).await?))
}

/// POST /captain/location
pub async fn report_location(
    State(state): State<AppState>,
    Caller(captain): Caller,
    Json(at): Json<Coordinates>,
) -> Result<Json<Captain>, ApiError> {
    Ok(Json(state.service.report_location(&captain, at).await?))
}
