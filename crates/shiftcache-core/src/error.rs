use thiserror::Error;

use crate::models::ShiftStatus;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShiftError {
    #[error("Shift source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Shift with ID {0} not found")]
    NotFound(String),

    #[error("Shift {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: ShiftStatus,
        to: ShiftStatus,
    },

    #[error("No shifts found for the provided IDs: {}", .0.join(", "))]
    NoneMatched(Vec<String>),

    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),
}

impl ShiftError {
    /// Failures the caller caused (bad id, bad transition) rather than the system.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ShiftError::NotFound(_) | ShiftError::InvalidTransition { .. } | ShiftError::NoneMatched(_)
        )
    }
}
