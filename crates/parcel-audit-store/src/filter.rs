//! Event filters and pagination.

use chrono::{DateTime, Utc};
use parcel_audit_types::{AuditAction, AuditEvent, AuditOutcome, AuditPriority, ResourceType};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Conjunction of optional criteria over audit events.
///
/// An unset criterion matches everything. `outcomes` and `tags` match when
/// the event's value is any of the listed entries. The time range is
/// inclusive on both ends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditFilter {
    pub action: Option<AuditAction>,
    pub outcomes: Vec<AuditOutcome>,
    pub priority: Option<AuditPriority>,
    pub resource_type: Option<ResourceType>,
    pub actor_id: Option<String>,
    pub session_id: Option<String>,
    pub ip_address: Option<String>,
    pub tags: Vec<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl AuditFilter {
    /// Create an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    /// Add an accepted outcome.
    pub fn outcome(mut self, outcome: AuditOutcome) -> Self {
        self.outcomes.push(outcome);
        self
    }

    pub fn priority(mut self, priority: AuditPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn resource_type(mut self, resource_type: ResourceType) -> Self {
        self.resource_type = Some(resource_type);
        self
    }

    pub fn actor_id(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    /// Add an accepted tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Restrict to `[start, end]`; either bound may be open.
    pub fn between(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Check if an event satisfies every criterion.
    pub fn matches(&self, event: &AuditEvent) -> bool {
        if self.action.is_some_and(|a| a != event.action()) {
            return false;
        }
        if !self.outcomes.is_empty() && !self.outcomes.contains(&event.outcome()) {
            return false;
        }
        if self.priority.is_some_and(|p| p != event.priority()) {
            return false;
        }
        if self.resource_type.is_some() && self.resource_type != event.resource_type() {
            return false;
        }
        if self.actor_id.is_some() && self.actor_id.as_deref() != event.user_id() {
            return false;
        }
        if self.session_id.is_some() && self.session_id.as_deref() != event.session_id() {
            return false;
        }
        if self.ip_address.is_some() && self.ip_address.as_deref() != event.ip_address() {
            return false;
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|t| event.has_tag(t)) {
            return false;
        }
        if self.start.is_some_and(|start| event.timestamp() < start) {
            return false;
        }
        if self.end.is_some_and(|end| event.timestamp() > end) {
            return false;
        }
        true
    }
}

/// Canonical retrieval order: newest first, ties broken by id descending.
pub(crate) fn newest_first(a: &AuditEvent, b: &AuditEvent) -> Ordering {
    b.timestamp()
        .cmp(&a.timestamp())
        .then_with(|| b.id().as_uuid().cmp(&a.id().as_uuid()))
}

/// One-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Page number, starting at 1.
    pub number: u32,
    /// Records per page.
    pub size: u32,
}

impl Page {
    /// Create a page request.
    pub fn new(number: u32, size: u32) -> Self {
        Self { number, size }
    }

    /// Records to skip before this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.number.saturating_sub(1)) * u64::from(self.size)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { number: 1, size: 50 }
    }
}
