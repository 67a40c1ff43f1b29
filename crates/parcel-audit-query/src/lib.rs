//! Audit log queries for Parcel.
//!
//! [`AuditQueryService`] is the read side of the audit store: filtered
//! listings with pagination, lookups by id, per-action summaries,
//! time-bucketed activity, CSV/JSON export and retention cleanup.

mod error;
pub mod export;
mod service;
mod summary;

pub use error::{QueryError, QueryResult};
pub use export::{ExportError, ExportFormat, CSV_HEADERS};
pub use service::{AuditQueryService, DateRangeReport, ExportOutput, Listing, Pagination};
pub use summary::{
    bucket_events, summarize, ActionSummary, AuditSummary, Granularity, OutcomeCount, Statistics,
    TimeBucket,
};

pub use parcel_audit_store::{AuditFilter, Page};
