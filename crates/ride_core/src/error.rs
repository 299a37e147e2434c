//! Error taxonomy surfaced by every trip operation.

use crate::spatial::IndexError;
use crate::store::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RideError {
    /// Missing credential, wrong role, or acting on a trip the caller does not own.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The trip's current status does not admit the requested step.
    #[error("rejected: {0}")]
    InvalidTransition(String),

    /// A claim lost to another captain or the trip left REQUESTED.
    #[error("trip not available")]
    NotAvailable,

    #[error("invalid request: {0}")]
    Validation(String),

    /// Store or index temporarily unreachable; callers retry on their own schedule.
    #[error("temporarily unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for RideError {
    fn from(err: StoreError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl From<IndexError> for RideError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::InvalidCoordinates(msg) => Self::Validation(msg),
            IndexError::Unavailable(msg) => Self::Unavailable(msg),
        }
    }
}

pub type RideResult<T> = Result<T, RideError>;
