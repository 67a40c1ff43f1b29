//! Storage contract.

use crate::{AuditFilter, Page, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parcel_audit_types::{AuditEvent, AuditEventId};

/// Append-mostly store of audit events.
///
/// Inserts are idempotent on event id so a retried batch does not
/// duplicate records that already landed. Retrieval is always ordered by
/// timestamp descending, ties broken by id descending.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Insert a single event.
    async fn insert(&self, event: &AuditEvent) -> StoreResult<()>;

    /// Insert a batch atomically. Returns the number of new records.
    async fn insert_many(&self, events: &[AuditEvent]) -> StoreResult<usize>;

    /// Fetch one event by id.
    async fn get(&self, id: AuditEventId) -> StoreResult<Option<AuditEvent>>;

    /// Fetch matching events, optionally restricted to one page.
    async fn find(&self, filter: &AuditFilter, page: Option<Page>) -> StoreResult<Vec<AuditEvent>>;

    /// Count matching events.
    async fn count(&self, filter: &AuditFilter) -> StoreResult<u64>;

    /// Delete every event strictly older than `cutoff`.
    async fn delete_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;
}
