//! Query errors.

use parcel_audit_store::StoreError;
use thiserror::Error;

/// Query operation result.
pub type QueryResult<T> = Result<T, QueryError>;

/// Query errors.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Bad filter, paging or date input.
    #[error("Invalid argument: {0}")]
    Validation(String),

    #[error("Audit log not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Export error: {0}")]
    Export(#[from] crate::export::ExportError),
}

impl QueryError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
