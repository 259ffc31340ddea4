//! Boundary error types and their status codes.

use poolkeeper_placement::AllocationError;
use poolkeeper_state::StateError;
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced to the transport, each with an HTTP-style status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::Internal(_) => 500,
        }
    }
}

impl From<StateError> for ApiError {
    fn from(e: StateError) -> Self {
        match e {
            StateError::Validation(msg) => ApiError::BadRequest(msg),
            StateError::NotFound(what) => ApiError::NotFound(format!("{what} not found")),
            other => {
                error!(error = %other, "slot registry failure");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<AllocationError> for ApiError {
    fn from(e: AllocationError) -> Self {
        match e {
            AllocationError::Validation(msg) => ApiError::BadRequest(msg),
            AllocationError::SlotNotFound(id) => ApiError::NotFound(format!("slot {id} not found")),
            AllocationError::State(inner) => inner.into(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::BadRequest(format!("invalid request: {e}"))
    }
}
