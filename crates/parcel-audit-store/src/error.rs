//! Store errors.

use std::time::Duration;

/// Durable store failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store worker failed: {0}")]
    Worker(String),
}

/// Store result.
pub type StoreResult<T> = Result<T, StoreError>;
