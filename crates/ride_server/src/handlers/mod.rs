pub mod captain;
pub mod realtime;
pub mod rider;
pub mod trips;

use axum::extract::Path;
use ride_core::model::TripId;

use crate::error::ApiError;

/// Parses the `{id}` path segment, answering 400 on a malformed id.
pub(crate) fn trip_id(Path(raw): Path<String>) -> Result<TripId, ApiError> {
    Ok(raw.parse::<TripId>()?)
}
