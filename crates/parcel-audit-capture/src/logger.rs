//! The batching engine.

use crate::batch::{BatchConfig, EventBatch, PendingQueue};
use async_trait::async_trait;
use parcel_audit_store::AuditStore;
use parcel_audit_types::{AuditEvent, AuditOutcome};
use parcel_common_log::spans::{flush_span, Timer};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tracing::{debug, error, trace, warn, Instrument};

/// Destination for finished audit events.
///
/// Implementations must never fail the caller; problems are logged.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Hand an event to the audit pipeline.
    async fn submit(&self, event: AuditEvent);
}

/// Counters describing what the engine has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoggerStats {
    /// Events written through the immediate path.
    pub immediate_writes: u64,
    /// Bulk writes that succeeded.
    pub batches_flushed: u64,
    /// Events persisted by bulk writes.
    pub events_flushed: u64,
    /// Failed store writes of either kind.
    pub write_failures: u64,
    /// Events given up on.
    pub events_dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    immediate_writes: AtomicU64,
    batches_flushed: AtomicU64,
    events_flushed: AtomicU64,
    write_failures: AtomicU64,
    events_dropped: AtomicU64,
}

struct ArmedTimer {
    id: u64,
    _cancel: oneshot::Sender<()>,
}

#[derive(Default)]
struct BatchState {
    pending: PendingQueue,
    /// Events swapped out by the bulk write currently running.
    in_flight: usize,
    timer: Option<ArmedTimer>,
    next_timer_id: u64,
}

impl BatchState {
    /// Cancel the armed timer, if any. Dropping the sender wakes the task.
    fn disarm(&mut self) {
        self.timer = None;
    }
}

struct Inner {
    config: BatchConfig,
    store: Arc<dyn AuditStore>,
    state: Mutex<BatchState>,
    /// Held from swapping out a batch until its write has settled.
    flush_guard: AsyncMutex<()>,
    counters: Counters,
}

/// Audit logger that batches routine events and writes alarms immediately.
///
/// Events with `CRITICAL` priority or an `ERROR` outcome are inserted on
/// their own before `submit` returns. Everything else is queued and
/// bulk-inserted once `batch_size` events are pending or `batch_timeout`
/// has elapsed since the first of them arrived, whichever comes first.
///
/// Store failures never reach the caller. A failed batch is put back at the
/// front of the queue once; a second failure drops it. Failed immediate
/// writes are not retried. Both are reported through `tracing`.
///
/// Bulk writes are serialized: a batch-full flush runs on a spawned task so
/// the submitting caller only pays for queueing.
///
/// Clones share one queue and one flush timer. Call [`AuditLogger::drain`]
/// (or [`AuditLogger::shutdown`]) before the process exits.
#[derive(Clone)]
pub struct AuditLogger {
    inner: Arc<Inner>,
}

impl AuditLogger {
    /// Create a logger writing to `store`.
    pub fn new(config: BatchConfig, store: Arc<dyn AuditStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                store,
                state: Mutex::new(BatchState::default()),
                flush_guard: AsyncMutex::new(()),
                counters: Counters::default(),
            }),
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &BatchConfig {
        &self.inner.config
    }

    /// Check if an event passes the enable flag and level threshold.
    ///
    /// `ERROR` outcomes are recorded regardless of level.
    pub fn admits(&self, event: &AuditEvent) -> bool {
        let config = &self.inner.config;
        config.enabled
            && (event.outcome() == AuditOutcome::Error || config.min_level.admits(event.priority()))
    }

    /// Submit an event.
    ///
    /// Immediate events are persisted before this returns. Routine events
    /// return after queueing; when one fills the batch the flush is handed
    /// to a spawned task.
    pub async fn submit(&self, event: AuditEvent) {
        if !self.admits(&event) {
            trace!(action = %event.action(), priority = %event.priority(), "Audit event below threshold");
            return;
        }

        if event.requires_immediate_write() {
            self.write_immediate(event).await;
            return;
        }

        let full = {
            let mut state = self.inner.state.lock();
            state.pending.push(event);
            if state.pending.len() >= self.inner.config.batch_size {
                state.disarm();
                true
            } else {
                if state.timer.is_none() {
                    self.arm_timer(&mut state);
                }
                false
            }
        };

        if full {
            debug!("Audit batch full");
            let logger = self.clone();
            tokio::spawn(async move { logger.flush().await });
        }
    }

    /// Submit without waiting.
    ///
    /// Requires a running Tokio runtime.
    pub fn record(&self, event: AuditEvent) {
        let logger = self.clone();
        tokio::spawn(async move { logger.submit(event).await });
    }

    /// Flush every pending event now.
    ///
    /// Waits for a bulk write already in flight before taking the queue.
    pub async fn flush(&self) {
        let _guard = self.inner.flush_guard.lock().await;
        self.flush_locked().await;
    }

    async fn flush_locked(&self) {
        let batch = {
            let mut state = self.inner.state.lock();
            state.disarm();
            let batch = state.pending.take();
            state.in_flight = batch.len();
            batch
        };
        if batch.is_empty() {
            return;
        }

        let span = flush_span(batch.len());
        self.write_batch(batch).instrument(span).await;
        self.inner.state.lock().in_flight = 0;
    }

    /// Cancel the flush timer and persist whatever is pending.
    ///
    /// Waits for any bulk write in flight, then keeps flushing until the
    /// queue is empty, so a batch that failed and was requeued meanwhile
    /// gets its second attempt here. Submits that keep arriving extend the
    /// drain; bound it with [`AuditLogger::shutdown`].
    ///
    /// Safe to call repeatedly and with an empty queue.
    pub async fn drain(&self) {
        let _guard = self.inner.flush_guard.lock().await;
        loop {
            self.flush_locked().await;
            let settled = {
                let mut state = self.inner.state.lock();
                if state.pending.is_empty() {
                    state.disarm();
                }
                state.pending.is_empty()
            };
            if settled {
                return;
            }
        }
    }

    /// Drain, giving up after `wait`. Returns whether the drain finished.
    pub async fn shutdown(&self, wait: Duration) -> bool {
        match tokio::time::timeout(wait, self.drain()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    unsettled = self.unsettled_len(),
                    wait_ms = wait.as_millis() as u64,
                    "Audit drain did not finish; pending events are lost"
                );
                false
            }
        }
    }

    /// Number of queued events.
    pub fn pending_len(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    /// Queued events plus those in a bulk write that has not settled.
    ///
    /// After a timed-out [`AuditLogger::shutdown`] this is the number of
    /// events that may not have been persisted.
    pub fn unsettled_len(&self) -> usize {
        let state = self.inner.state.lock();
        state.pending.len() + state.in_flight
    }

    /// Check if a flush timer is armed.
    pub fn timer_armed(&self) -> bool {
        self.inner.state.lock().timer.is_some()
    }

    /// Snapshot of the engine counters.
    pub fn stats(&self) -> LoggerStats {
        let c = &self.inner.counters;
        LoggerStats {
            immediate_writes: c.immediate_writes.load(Ordering::Relaxed),
            batches_flushed: c.batches_flushed.load(Ordering::Relaxed),
            events_flushed: c.events_flushed.load(Ordering::Relaxed),
            write_failures: c.write_failures.load(Ordering::Relaxed),
            events_dropped: c.events_dropped.load(Ordering::Relaxed),
        }
    }

    async fn write_immediate(&self, event: AuditEvent) {
        let timeout = self.inner.config.write_timeout;
        let counters = &self.inner.counters;

        match tokio::time::timeout(timeout, self.inner.store.insert(&event)).await {
            Ok(Ok(())) => {
                counters.immediate_writes.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(e)) => {
                counters.write_failures.fetch_add(1, Ordering::Relaxed);
                counters.events_dropped.fetch_add(1, Ordering::Relaxed);
                error!(id = %event.id(), action = %event.action(), error = %e, "Failed to write audit event");
            }
            Err(_) => {
                counters.write_failures.fetch_add(1, Ordering::Relaxed);
                counters.events_dropped.fetch_add(1, Ordering::Relaxed);
                error!(
                    id = %event.id(),
                    action = %event.action(),
                    timeout_ms = timeout.as_millis() as u64,
                    "Audit event write timed out"
                );
            }
        }
    }

    async fn write_batch(&self, batch: EventBatch) {
        let timeout = self.inner.config.write_timeout;
        let counters = &self.inner.counters;
        let timer = Timer::start("audit_flush");

        let failure = match tokio::time::timeout(timeout, self.inner.store.insert_many(&batch.events)).await {
            Ok(Ok(inserted)) => {
                timer.finish();
                tracing::Span::current().record("inserted", inserted as u64);
                counters.batches_flushed.fetch_add(1, Ordering::Relaxed);
                counters
                    .events_flushed
                    .fetch_add(batch.len() as u64, Ordering::Relaxed);
                debug!(events = batch.len(), inserted, "Flushed audit batch");
                return;
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {}ms", timeout.as_millis()),
        };

        counters.write_failures.fetch_add(1, Ordering::Relaxed);
        tracing::Span::current().record("error", failure.as_str());

        let size = batch.len();
        let mut state = self.inner.state.lock();
        let dropped = state.pending.requeue_front(batch);
        if dropped > 0 {
            counters
                .events_dropped
                .fetch_add(dropped as u64, Ordering::Relaxed);
            error!(events = size, dropped, error = %failure, "Audit batch write failed; events dropped");
        } else {
            warn!(events = size, error = %failure, "Audit batch write failed; requeued");
        }

        if !state.pending.is_empty() && state.timer.is_none() {
            self.arm_timer(&mut state);
        }
    }

    fn arm_timer(&self, state: &mut BatchState) {
        let id = state.next_timer_id;
        state.next_timer_id += 1;

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let after = self.inner.config.batch_timeout;

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel_rx => return,
                _ = tokio::time::sleep(after) => {}
            }
            if let Some(inner) = weak.upgrade() {
                AuditLogger { inner }.on_timer(id).await;
            }
        });

        state.timer = Some(ArmedTimer {
            id,
            _cancel: cancel_tx,
        });
    }

    async fn on_timer(&self, id: u64) {
        let current = {
            let mut state = self.inner.state.lock();
            match &state.timer {
                Some(timer) if timer.id == id => {
                    state.timer = None;
                    true
                }
                _ => false,
            }
        };
        if current {
            debug!("Audit batch timeout elapsed");
            self.flush().await;
        }
    }
}

#[async_trait]
impl AuditSink for AuditLogger {
    async fn submit(&self, event: AuditEvent) {
        AuditLogger::submit(self, event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parcel_audit_store::MemoryStore;
    use parcel_audit_types::{AuditAction, AuditLevel, AuditPriority};

    fn logger(config: BatchConfig) -> (AuditLogger, MemoryStore) {
        let store = MemoryStore::new();
        (AuditLogger::new(config, Arc::new(store.clone())), store)
    }

    fn event(priority: AuditPriority) -> AuditEvent {
        AuditEvent::builder(AuditAction::ApiRequest)
            .priority(priority)
            .build()
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_logger_records_nothing() {
        let (logger, store) = logger(BatchConfig {
            enabled: false,
            ..Default::default()
        });

        logger
            .submit(
                AuditEvent::builder(AuditAction::SystemError)
                    .outcome(AuditOutcome::Error)
                    .build(),
            )
            .await;
        logger.submit(event(AuditPriority::Medium)).await;
        logger.drain().await;

        assert!(store.is_empty());
        assert_eq!(logger.pending_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_min_level_skips_low_priority_but_not_errors() {
        let (logger, store) = logger(BatchConfig {
            min_level: AuditLevel::Warn,
            ..Default::default()
        });

        logger.submit(event(AuditPriority::Medium)).await;
        assert_eq!(logger.pending_len(), 0);

        logger.submit(event(AuditPriority::High)).await;
        assert_eq!(logger.pending_len(), 1);

        logger
            .submit(
                AuditEvent::builder(AuditAction::ApiError)
                    .outcome(AuditOutcome::Error)
                    .priority(AuditPriority::Low)
                    .build(),
            )
            .await;
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_arming_is_idempotent() {
        let (logger, _store) = logger(BatchConfig::default());

        logger.submit(event(AuditPriority::Medium)).await;
        logger.submit(event(AuditPriority::Medium)).await;
        assert!(logger.timer_armed());

        let id = logger.inner.state.lock().timer.as_ref().map(|t| t.id);
        assert_eq!(id, Some(0));
        assert_eq!(logger.inner.state.lock().next_timer_id, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_timer_does_not_flush() {
        let (logger, store) = logger(BatchConfig::default());

        logger.submit(event(AuditPriority::Medium)).await;
        logger.on_timer(42).await;

        assert_eq!(logger.pending_len(), 1);
        assert!(store.is_empty());
    }
}
