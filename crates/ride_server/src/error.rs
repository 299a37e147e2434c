use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ride_core::RideError;
use serde::Serialize;
use tracing::warn;

use crate::auth::AuthError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// HTTP face of domain and auth failures.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Ride(#[from] RideError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Ride(err) => match err {
                RideError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                RideError::NotFound(_) => StatusCode::NOT_FOUND,
                RideError::InvalidTransition(_) | RideError::NotAvailable => StatusCode::CONFLICT,
                RideError::Validation(_) => StatusCode::BAD_REQUEST,
                RideError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            ApiError::Auth(AuthError::Config(_) | AuthError::Signing(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self, %status, "request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
