//! Engine error types.
//!
//! Nothing here is fatal under normal operation: read paths degrade to
//! documented defaults, so errors surface only from write paths (a failed
//! transaction) or from callers handing us something unusable.

use thiserror::Error;

use crate::db::DbError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Event already consumed: {0}")]
    DuplicateEvent(String),

    #[error("Unknown pattern: {0}")]
    PatternNotFound(String),
}

impl EngineError {
    /// True when retrying the same call cannot succeed (caller bug or
    /// duplicate delivery), as opposed to transient storage trouble.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidEvent(_)
                | EngineError::DuplicateEvent(_)
                | EngineError::PatternNotFound(_)
        )
    }
}
