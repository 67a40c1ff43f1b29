//! Pending-event queue for batched persistence.

use parcel_audit_types::AuditEvent;
use parcel_common_config::AuditConfig;
use std::collections::VecDeque;
use std::time::Duration;

/// Number of times a failed batch is put back before its events are dropped.
pub const MAX_REQUEUES: u8 = 1;

/// Configuration for the batching engine.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Whether events are recorded at all.
    pub enabled: bool,
    /// Minimum recording level.
    pub min_level: parcel_audit_types::AuditLevel,
    /// Pending events that trigger an immediate flush.
    pub batch_size: usize,
    /// Maximum time a batched event waits before a flush.
    pub batch_timeout: Duration,
    /// Upper bound on a single store write.
    pub write_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::from(&AuditConfig::default())
    }
}

impl From<&AuditConfig> for BatchConfig {
    fn from(config: &AuditConfig) -> Self {
        Self {
            enabled: config.enabled,
            min_level: config.min_level,
            batch_size: config.batch_size.max(1),
            batch_timeout: config.batch_timeout(),
            write_timeout: config.write_timeout(),
        }
    }
}

/// Events swapped out of the queue for one bulk write.
#[derive(Debug, Default)]
pub struct EventBatch {
    /// Events in submission order.
    pub events: Vec<AuditEvent>,
    requeues: Vec<u8>,
}

impl EventBatch {
    /// Number of events in the batch.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// FIFO of events waiting for a flush.
///
/// Each entry remembers how many times it has been put back after a failed
/// write so a persistent outage cannot grow the queue without bound.
#[derive(Debug, Default)]
pub struct PendingQueue {
    entries: VecDeque<(AuditEvent, u8)>,
}

impl PendingQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(&mut self, event: AuditEvent) {
        self.entries.push_back((event, 0));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Swap out every pending entry.
    pub fn take(&mut self) -> EventBatch {
        let (events, requeues) = std::mem::take(&mut self.entries).into_iter().unzip();
        EventBatch { events, requeues }
    }

    /// Put a failed batch back at the front, keeping its order.
    ///
    /// Entries that already used their requeue are discarded; the number
    /// discarded is returned.
    pub fn requeue_front(&mut self, batch: EventBatch) -> usize {
        let mut dropped = 0;
        let retained: Vec<_> = batch
            .events
            .into_iter()
            .zip(batch.requeues)
            .filter_map(|(event, requeues)| {
                if requeues >= MAX_REQUEUES {
                    dropped += 1;
                    None
                } else {
                    Some((event, requeues + 1))
                }
            })
            .collect();

        for entry in retained.into_iter().rev() {
            self.entries.push_front(entry);
        }
        dropped
    }
}
