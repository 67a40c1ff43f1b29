//! Audit event record types for Parcel.
//!
//! An [`AuditEvent`] is the atomic, write-once unit recorded by the audit
//! pipeline. Events are assembled with [`AuditEventBuilder`]; the builder
//! stamps the timestamp and derives the tag set exactly once.

mod action;
mod actor;
mod category;
mod changes;
mod clock;
mod event;
mod id;
mod priority;
mod tags;

pub use action::AuditAction;
pub use actor::AuditActor;
pub use category::AuditCategory;
pub use changes::{diff_snapshots, ChangeSet};
pub use clock::{Clock, ManualClock, SystemClock};
pub use event::{
    AuditEvent, AuditEventBuilder, AuditOutcome, HttpMethod, RequestContext, RequestMetrics,
    ResourceRef, ResourceType,
};
pub use id::AuditEventId;
pub use priority::{AuditLevel, AuditPriority};
pub use tags::{derive_tags, ERROR_TAG, SECURITY_ACTIONS, SECURITY_TAG};
