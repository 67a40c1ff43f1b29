//! Constructors for the standard event shapes.
//!
//! Each function only builds an event; submitting it is up to the caller
//! (see [`crate::AuditRecorder`] and [`crate::AuditMiddleware`]).

use parcel_audit_types::{
    AuditAction, AuditActor, AuditEvent, AuditEventBuilder, AuditOutcome, AuditPriority,
    HttpMethod, RequestContext, RequestMetrics, ResourceRef, ResourceType, SECURITY_TAG,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Who is acting and through which request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallContext {
    pub actor: Option<AuditActor>,
    pub session_id: Option<String>,
    pub request: Option<RequestContext>,
    pub status_code: Option<u16>,
}

impl CallContext {
    /// Context with no actor and no request.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_actor(mut self, actor: AuditActor) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_request(mut self, request: RequestContext) -> Self {
        self.request = Some(request);
        self
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    fn builder(&self, action: AuditAction) -> AuditEventBuilder {
        let mut builder = AuditEvent::builder(action)
            .maybe_actor(self.actor.clone())
            .maybe_session_id(self.session_id.clone())
            .maybe_status_code(self.status_code);
        if let Some(request) = &self.request {
            builder = builder.request(request.clone());
        }
        builder
    }
}

/// Uploaded or served file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub id: Option<String>,
    pub filename: Option<String>,
    pub original_name: Option<String>,
    pub size: Option<u64>,
    pub mime_type: Option<String>,
    pub path: Option<String>,
}

fn with_details(mut builder: AuditEventBuilder, details: Value) -> AuditEventBuilder {
    match details {
        Value::Object(map) => {
            for (key, value) in map {
                builder = builder.metadata(key, value);
            }
            builder
        }
        Value::Null => builder,
        other => builder.metadata("details", other),
    }
}

fn text_field(entity: &Value, key: &str) -> Option<String> {
    match entity.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Describe an entity from its JSON representation.
///
/// The id comes from `_id` or `id`. The name is the email for users, the
/// title for land and listings, `transactionId` for transactions and the
/// file name for files, each falling back to the id.
pub fn resource_from_entity(resource_type: ResourceType, entity: &Value) -> ResourceRef {
    let id = text_field(entity, "_id").or_else(|| text_field(entity, "id"));
    let name = match resource_type {
        ResourceType::User => text_field(entity, "email"),
        ResourceType::Land | ResourceType::Listing => {
            text_field(entity, "title").or_else(|| text_field(entity, "id"))
        }
        ResourceType::Transaction => {
            text_field(entity, "transactionId").or_else(|| text_field(entity, "id"))
        }
        ResourceType::File => {
            text_field(entity, "filename").or_else(|| text_field(entity, "originalname"))
        }
        _ => None,
    };

    ResourceRef {
        resource_type,
        id,
        name,
    }
}

/// Authentication event. Success is `MEDIUM`, anything else `HIGH`.
pub fn auth(
    action: AuditAction,
    ctx: &CallContext,
    outcome: AuditOutcome,
    error: Option<&str>,
) -> AuditEvent {
    let priority = if outcome == AuditOutcome::Success {
        AuditPriority::Medium
    } else {
        AuditPriority::High
    };
    let mut builder = ctx
        .builder(action)
        .resource(ResourceRef::new(ResourceType::User))
        .outcome(outcome)
        .priority(priority);
    if let Some(message) = error {
        builder = builder.error(message, None);
    }
    if let Some(ua) = ctx.request.as_ref().and_then(|r| r.user_agent.clone()) {
        builder = builder.metadata("user_agent", ua);
    }
    builder.build()
}

/// Mutation of a domain entity. Transactions are `HIGH`, the rest `MEDIUM`.
pub fn mutation(
    action: AuditAction,
    ctx: &CallContext,
    resource: ResourceRef,
    before: Option<Value>,
    after: Option<Value>,
) -> AuditEvent {
    mutation_with_outcome(action, ctx, resource, before, after, AuditOutcome::Success)
}

/// Mutation of a domain entity that did not necessarily succeed.
pub fn mutation_with_outcome(
    action: AuditAction,
    ctx: &CallContext,
    resource: ResourceRef,
    before: Option<Value>,
    after: Option<Value>,
    outcome: AuditOutcome,
) -> AuditEvent {
    let priority = match resource.resource_type {
        ResourceType::Transaction => AuditPriority::High,
        _ => AuditPriority::Medium,
    };
    ctx.builder(action)
        .resource(resource)
        .changes(before, after)
        .outcome(outcome)
        .priority(priority)
        .build()
}

/// File operation.
pub fn file(
    action: AuditAction,
    ctx: &CallContext,
    file: &FileInfo,
    outcome: AuditOutcome,
    error: Option<&str>,
) -> AuditEvent {
    let mut resource = ResourceRef::new(ResourceType::File);
    resource.id = file.id.clone();
    resource.name = file.filename.clone().or_else(|| file.original_name.clone());

    let mut builder = ctx
        .builder(action)
        .resource(resource)
        .outcome(outcome)
        .priority(AuditPriority::Medium)
        .metrics(RequestMetrics {
            request_bytes: file.size,
            ..Default::default()
        });
    if let Some(size) = file.size {
        builder = builder.metadata("file_size", size);
    }
    if let Some(mime) = &file.mime_type {
        builder = builder.metadata("mime_type", mime);
    }
    if let Some(path) = &file.path {
        builder = builder.metadata("upload_path", path);
    }
    if let Some(message) = error {
        builder = builder.error(message, None);
    }
    builder.build()
}

/// Internally originated system event.
pub fn system(action: AuditAction, details: Value, priority: AuditPriority) -> AuditEvent {
    let builder = AuditEvent::builder(action)
        .resource(ResourceRef::new(ResourceType::System))
        .request(RequestContext {
            method: Some(HttpMethod::System),
            ..Default::default()
        })
        .priority(priority);
    with_details(builder, details).build()
}

/// Error event; always written immediately.
pub fn error(
    action: AuditAction,
    ctx: &CallContext,
    message: &str,
    stack: Option<String>,
    priority: AuditPriority,
) -> AuditEvent {
    ctx.builder(action)
        .resource(ResourceRef::new(ResourceType::System))
        .outcome(AuditOutcome::Error)
        .error(message, stack)
        .priority(priority)
        .build()
}

/// Security-relevant event, marked with the security tag.
pub fn security(
    action: AuditAction,
    ctx: &CallContext,
    details: Value,
    priority: AuditPriority,
) -> AuditEvent {
    let builder = ctx
        .builder(action)
        .resource(ResourceRef::new(ResourceType::System))
        .outcome(AuditOutcome::Warning)
        .priority(priority)
        .tag(SECURITY_TAG);
    with_details(builder, details).build()
}

/// One served API request.
pub fn api_request(
    ctx: &CallContext,
    elapsed: Duration,
    outcome: AuditOutcome,
    request_bytes: Option<u64>,
    response_bytes: Option<u64>,
    details: Value,
) -> AuditEvent {
    let builder = ctx
        .builder(AuditAction::ApiRequest)
        .resource(ResourceRef::new(ResourceType::Api))
        .outcome(outcome)
        .priority(AuditPriority::Low)
        .metrics(RequestMetrics {
            duration_ms: Some(elapsed.as_millis() as u64),
            request_bytes,
            response_bytes,
        });
    with_details(builder, details).build()
}

/// Session lifecycle event.
pub fn session(action: AuditAction, ctx: &CallContext, details: Value) -> AuditEvent {
    session_with(action, ctx, details, AuditOutcome::Success, AuditPriority::Medium)
}

/// Session lifecycle event with an explicit outcome and priority.
pub fn session_with(
    action: AuditAction,
    ctx: &CallContext,
    details: Value,
    outcome: AuditOutcome,
    priority: AuditPriority,
) -> AuditEvent {
    let mut resource = ResourceRef::new(ResourceType::Session);
    resource.id = ctx.session_id.clone();

    let builder = ctx
        .builder(action)
        .resource(resource)
        .outcome(outcome)
        .priority(priority);
    with_details(builder, details).build()
}
