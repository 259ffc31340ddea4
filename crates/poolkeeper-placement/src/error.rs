//! Allocation error types.

use poolkeeper_state::{SlotId, StateError};
use thiserror::Error;

/// Errors that can occur while allocating or releasing a cluster.
#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("invalid cluster request: {0}")]
    Validation(String),

    #[error("slot not found: {0}")]
    SlotNotFound(SlotId),

    #[error("slot registry error: {0}")]
    State(#[from] StateError),
}

pub type AllocationResult<T> = Result<T, AllocationError>;
