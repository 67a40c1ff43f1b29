//! In-memory store with fault injection.

use crate::filter::newest_first;
use crate::{AuditFilter, AuditStore, Page, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parcel_audit_types::{AuditEvent, AuditEventId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct Faults {
    failing_writes: u32,
    unavailable: bool,
    write_delay: Option<Duration>,
}

/// Audit store backed by a hash map.
///
/// Clones share the same contents. Write failures, outages and slow writes
/// can be injected for exercising the batching engine.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    events: Arc<Mutex<HashMap<AuditEventId, AuditEvent>>>,
    faults: Arc<Mutex<Faults>>,
    write_calls: Arc<Mutex<u64>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` write calls fail.
    pub fn fail_next_writes(&self, n: u32) {
        self.faults.lock().failing_writes = n;
    }

    /// Make every call fail until cleared.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults.lock().unavailable = unavailable;
    }

    /// Delay every write by `delay`.
    pub fn set_write_delay(&self, delay: Option<Duration>) {
        self.faults.lock().write_delay = delay;
    }

    /// Number of stored events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of write calls received, including failed ones.
    pub fn write_calls(&self) -> u64 {
        *self.write_calls.lock()
    }

    /// Snapshot of all events in canonical order.
    pub fn events(&self) -> Vec<AuditEvent> {
        let mut all: Vec<AuditEvent> = self.events.lock().values().cloned().collect();
        all.sort_by(newest_first);
        all
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.faults.lock().unavailable {
            return Err(StoreError::Unavailable("memory store offline".into()));
        }
        Ok(())
    }

    async fn before_write(&self) -> StoreResult<()> {
        *self.write_calls.lock() += 1;
        let delay = self.faults.lock().write_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_available()?;

        let mut faults = self.faults.lock();
        if faults.failing_writes > 0 {
            faults.failing_writes -= 1;
            return Err(StoreError::Unavailable("injected write failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn insert(&self, event: &AuditEvent) -> StoreResult<()> {
        self.before_write().await?;
        self.events
            .lock()
            .entry(event.id())
            .or_insert_with(|| event.clone());
        Ok(())
    }

    async fn insert_many(&self, events: &[AuditEvent]) -> StoreResult<usize> {
        self.before_write().await?;
        let mut stored = self.events.lock();
        let mut inserted = 0;
        for event in events {
            if !stored.contains_key(&event.id()) {
                stored.insert(event.id(), event.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn get(&self, id: AuditEventId) -> StoreResult<Option<AuditEvent>> {
        self.check_available()?;
        Ok(self.events.lock().get(&id).cloned())
    }

    async fn find(&self, filter: &AuditFilter, page: Option<Page>) -> StoreResult<Vec<AuditEvent>> {
        self.check_available()?;
        let mut matching: Vec<AuditEvent> = self
            .events
            .lock()
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        matching.sort_by(newest_first);

        Ok(match page {
            Some(page) => matching
                .into_iter()
                .skip(page.offset() as usize)
                .take(page.size as usize)
                .collect(),
            None => matching,
        })
    }

    async fn count(&self, filter: &AuditFilter) -> StoreResult<u64> {
        self.check_available()?;
        Ok(self.events.lock().values().filter(|e| filter.matches(e)).count() as u64)
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        self.check_available()?;
        let mut stored = self.events.lock();
        let before = stored.len();
        stored.retain(|_, e| e.timestamp() >= cutoff);
        Ok((before - stored.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use parcel_audit_types::AuditAction;

    fn event_at(ts: DateTime<Utc>) -> AuditEvent {
        AuditEvent::builder(AuditAction::ApiRequest).build_at(ts)
    }

    #[tokio::test]
    async fn test_insert_is_idempotent() {
        let store = MemoryStore::new();
        let event = event_at(Utc::now());

        store.insert(&event).await.unwrap();
        store.insert(&event).await.unwrap();
        let inserted = store.insert_many(&[event.clone()]).await.unwrap();

        assert_eq!(inserted, 0);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let store = MemoryStore::new();
        store.fail_next_writes(1);

        assert!(store.insert(&event_at(Utc::now())).await.is_err());
        assert!(store.insert(&event_at(Utc::now())).await.is_ok());
        assert_eq!(store.write_calls(), 2);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_find_orders_newest_first_and_pages() {
        let store = MemoryStore::new();
        let base = Utc::now();
        let events: Vec<_> = (0..5)
            .map(|i| event_at(base + ChronoDuration::seconds(i)))
            .collect();
        store.insert_many(&events).await.unwrap();

        let page = store
            .find(&AuditFilter::new(), Some(Page::new(2, 2)))
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id(), events[2].id());
        assert_eq!(page[1].id(), events[1].id());
    }

    #[tokio::test]
    async fn test_delete_before_keeps_cutoff() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .insert_many(&[event_at(now - ChronoDuration::days(100)), event_at(now)])
            .await
            .unwrap();

        assert_eq!(store.delete_before(now).await.unwrap(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_rejects_reads() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.count(&AuditFilter::new()).await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
