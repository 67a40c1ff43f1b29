//! Audit event capture for Parcel.
//!
//! This crate turns application activity into audit events and gets them
//! to a store:
//!
//! - [`AuditLogger`]: batching engine with an immediate path for alarms
//! - [`AuditRecorder`]: typed recorders for auth, entity, file, system,
//!   error, security, API and session events
//! - [`AuditMiddleware`]: per-request hook driven by [`RequestObserver`]s
//!
//! Everything submits through the [`AuditSink`] trait, so recorders and
//! middleware can be pointed at any sink in tests.

mod batch;
pub mod events;
mod logger;
mod middleware;
mod observe;
mod recorder;

pub use batch::{BatchConfig, EventBatch, PendingQueue, MAX_REQUEUES};
pub use events::{CallContext, FileInfo};
pub use logger::{AuditLogger, AuditSink, LoggerStats};
pub use middleware::AuditMiddleware;
pub use observe::{
    ApiRequestObserver, AuthObserver, CrudObserver, FileObserver, RequestDescriptor,
    RequestObserver, ResponseDescriptor, SecurityObserver, REDACTED, SENSITIVE_HEADERS,
};
pub use recorder::AuditRecorder;

// Re-export types for convenience
pub use parcel_audit_types::{
    AuditAction, AuditActor, AuditEvent, AuditEventBuilder, AuditOutcome, AuditPriority,
    ResourceRef, ResourceType,
};

/// Build an event and submit it to a sink. Evaluates to the submit future.
///
/// ```ignore
/// audit!(logger, AuditAction::SystemStartup).await;
/// audit!(logger, AuditAction::LandUpdate, actor = actor, priority = AuditPriority::High).await;
/// ```
#[macro_export]
macro_rules! audit {
    ($sink:expr, $action:expr) => {
        $crate::AuditSink::submit(&$sink, $crate::AuditEvent::builder($action).build())
    };
    ($sink:expr, $action:expr, $($key:ident = $value:expr),+ $(,)?) => {{
        let mut builder = $crate::AuditEvent::builder($action);
        $(
            builder = builder.$key($value);
        )+
        $crate::AuditSink::submit(&$sink, builder.build())
    }};
}
