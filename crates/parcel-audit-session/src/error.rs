//! Session errors.

use crate::validate::InvalidReason;
use thiserror::Error;

/// Session operation result.
pub type SessionResult<T> = Result<T, SessionError>;

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session rejected: {0}")]
    Invalid(InvalidReason),

    #[error("Session store error: {0}")]
    Store(String),
}
