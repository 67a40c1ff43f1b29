//! Convenience recorders over an audit sink.

use crate::events::{self, CallContext, FileInfo};
use crate::AuditSink;
use parcel_audit_types::{AuditAction, AuditOutcome, AuditPriority, ResourceType};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Records the standard event shapes for application code.
#[derive(Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
}

impl AuditRecorder {
    /// Create a recorder submitting to `sink`.
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Record an authentication attempt or change.
    pub async fn auth(
        &self,
        action: AuditAction,
        ctx: &CallContext,
        outcome: AuditOutcome,
        error: Option<&str>,
    ) {
        self.sink.submit(events::auth(action, ctx, outcome, error)).await;
    }

    /// Record a change to a user account.
    pub async fn user_action(
        &self,
        action: AuditAction,
        ctx: &CallContext,
        target: Option<&Value>,
        before: Option<Value>,
        after: Option<Value>,
    ) {
        self.entity_action(action, ResourceType::User, ctx, target, before, after)
            .await;
    }

    /// Record a change to a land record.
    pub async fn land_action(
        &self,
        action: AuditAction,
        ctx: &CallContext,
        land: Option<&Value>,
        before: Option<Value>,
        after: Option<Value>,
    ) {
        self.entity_action(action, ResourceType::Land, ctx, land, before, after)
            .await;
    }

    /// Record a change to a listing.
    pub async fn listing_action(
        &self,
        action: AuditAction,
        ctx: &CallContext,
        listing: Option<&Value>,
        before: Option<Value>,
        after: Option<Value>,
    ) {
        self.entity_action(action, ResourceType::Listing, ctx, listing, before, after)
            .await;
    }

    /// Record a change to a transaction.
    pub async fn transaction_action(
        &self,
        action: AuditAction,
        ctx: &CallContext,
        transaction: Option<&Value>,
        before: Option<Value>,
        after: Option<Value>,
    ) {
        self.entity_action(action, ResourceType::Transaction, ctx, transaction, before, after)
            .await;
    }

    async fn entity_action(
        &self,
        action: AuditAction,
        resource_type: ResourceType,
        ctx: &CallContext,
        entity: Option<&Value>,
        before: Option<Value>,
        after: Option<Value>,
    ) {
        let resource = events::resource_from_entity(resource_type, entity.unwrap_or(&Value::Null));
        self.sink
            .submit(events::mutation(action, ctx, resource, before, after))
            .await;
    }

    pub async fn file_action(
        &self,
        action: AuditAction,
        ctx: &CallContext,
        file: &FileInfo,
        outcome: AuditOutcome,
        error: Option<&str>,
    ) {
        self.sink
            .submit(events::file(action, ctx, file, outcome, error))
            .await;
    }

    pub async fn system_action(&self, action: AuditAction, details: Value, priority: AuditPriority) {
        self.sink.submit(events::system(action, details, priority)).await;
    }

    /// Record a failure; written immediately.
    pub async fn error(
        &self,
        action: AuditAction,
        ctx: &CallContext,
        message: &str,
        stack: Option<String>,
    ) {
        self.sink
            .submit(events::error(action, ctx, message, stack, AuditPriority::High))
            .await;
    }

    pub async fn security_event(&self, action: AuditAction, ctx: &CallContext, details: Value) {
        self.sink
            .submit(events::security(action, ctx, details, AuditPriority::High))
            .await;
    }

    pub async fn api_request(
        &self,
        ctx: &CallContext,
        elapsed: Duration,
        outcome: AuditOutcome,
        request_bytes: Option<u64>,
        response_bytes: Option<u64>,
    ) {
        self.sink
            .submit(events::api_request(
                ctx,
                elapsed,
                outcome,
                request_bytes,
                response_bytes,
                Value::Null,
            ))
            .await;
    }

    pub async fn session_event(&self, action: AuditAction, ctx: &CallContext, details: Value) {
        self.sink.submit(events::session(action, ctx, details)).await;
    }
}
