//! Core audit event type.

use crate::{derive_tags, AuditAction, AuditActor, AuditEventId, AuditPriority, ChangeSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use strum::{Display, EnumString};

/// Outcome of an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditOutcome {
    Success,
    Failure,
    Pending,
    Error,
    Warning,
    Info,
}

impl AuditOutcome {
    /// Check if the outcome counts as an error for tagging and statistics.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error | Self::Failure)
    }

    /// Map an HTTP status code to an outcome.
    pub fn from_status(status_code: u16) -> Self {
        if status_code >= 400 {
            Self::Failure
        } else {
            Self::Success
        }
    }
}

impl Default for AuditOutcome {
    fn default() -> Self {
        Self::Success
    }
}

/// Kind of entity an event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    User,
    Land,
    Listing,
    Transaction,
    Session,
    System,
    File,
    Api,
}

/// Request method recorded on an event. `System` marks internal origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    System,
}

/// Entity affected by an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Type of the resource.
    pub resource_type: ResourceType,
    /// Resource identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Human-readable resource name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ResourceRef {
    /// Create a reference with only a type.
    pub fn new(resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            id: None,
            name: None,
        }
    }

    /// Add an identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a resource name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Inbound request the event was observed on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Timing and size measurements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_bytes: Option<u64>,
}

/// A complete audit event.
///
/// Fields are only readable; an event is never modified after `build()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    id: AuditEventId,
    timestamp: DateTime<Utc>,
    action: AuditAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    actor: Option<AuditActor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resource: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request: Option<RequestContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    change_set: Option<ChangeSet>,
    outcome: AuditOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metrics: Option<RequestMetrics>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<String, Value>,
    tags: BTreeSet<String>,
    priority: AuditPriority,
}

impl AuditEvent {
    /// Create a new event builder.
    pub fn builder(action: AuditAction) -> AuditEventBuilder {
        AuditEventBuilder::new(action)
    }

    pub fn id(&self) -> AuditEventId {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn action(&self) -> AuditAction {
        self.action
    }

    pub fn actor(&self) -> Option<&AuditActor> {
        self.actor.as_ref()
    }

    /// Identifier of the acting user, if any.
    pub fn user_id(&self) -> Option<&str> {
        self.actor.as_ref().map(|a| a.user_id.as_str())
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn resource(&self) -> Option<&ResourceRef> {
        self.resource.as_ref()
    }

    pub fn resource_type(&self) -> Option<ResourceType> {
        self.resource.as_ref().map(|r| r.resource_type)
    }

    pub fn request(&self) -> Option<&RequestContext> {
        self.request.as_ref()
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.request.as_ref().and_then(|r| r.ip_address.as_deref())
    }

    pub fn change_set(&self) -> Option<&ChangeSet> {
        self.change_set.as_ref()
    }

    pub fn outcome(&self) -> AuditOutcome {
        self.outcome
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn error_stack(&self) -> Option<&str> {
        self.error_stack.as_deref()
    }

    pub fn metrics(&self) -> Option<&RequestMetrics> {
        self.metrics.as_ref()
    }

    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn priority(&self) -> AuditPriority {
        self.priority
    }

    /// Check if the event must bypass batching.
    pub fn requires_immediate_write(&self) -> bool {
        self.priority == AuditPriority::Critical || self.outcome == AuditOutcome::Error
    }
}

/// Builder for constructing audit events.
#[derive(Debug)]
pub struct AuditEventBuilder {
    action: AuditAction,
    actor: Option<AuditActor>,
    session_id: Option<String>,
    resource: Option<ResourceRef>,
    request: Option<RequestContext>,
    change_set: Option<ChangeSet>,
    outcome: AuditOutcome,
    status_code: Option<u16>,
    error_message: Option<String>,
    error_stack: Option<String>,
    metrics: Option<RequestMetrics>,
    metadata: BTreeMap<String, Value>,
    extra_tags: Vec<String>,
    priority: AuditPriority,
}

impl AuditEventBuilder {
    /// Create a new builder.
    pub fn new(action: AuditAction) -> Self {
        Self {
            action,
            actor: None,
            session_id: None,
            resource: None,
            request: None,
            change_set: None,
            outcome: AuditOutcome::Success,
            status_code: None,
            error_message: None,
            error_stack: None,
            metrics: None,
            metadata: BTreeMap::new(),
            extra_tags: Vec::new(),
            priority: AuditPriority::default(),
        }
    }

    /// Set the actor.
    pub fn actor(mut self, actor: AuditActor) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Set the actor if one is known.
    pub fn maybe_actor(mut self, actor: Option<AuditActor>) -> Self {
        self.actor = actor;
        self
    }

    /// Set the session identifier.
    pub fn session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    /// Set the session identifier if one is known.
    pub fn maybe_session_id(mut self, id: Option<String>) -> Self {
        self.session_id = id;
        self
    }

    /// Set the affected resource.
    pub fn resource(mut self, resource: ResourceRef) -> Self {
        self.resource = Some(resource);
        self
    }

    /// Set the request context.
    pub fn request(mut self, request: RequestContext) -> Self {
        self.request = Some(request);
        self
    }

    /// Record before/after snapshots; the diff is derived here.
    pub fn changes(mut self, before: Option<Value>, after: Option<Value>) -> Self {
        let set = ChangeSet::new(before, after);
        self.change_set = (!set.is_empty()).then_some(set);
        self
    }

    /// Set the outcome.
    pub fn outcome(mut self, outcome: AuditOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Set the response status code.
    pub fn status_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Set the status code if one is known.
    pub fn maybe_status_code(mut self, code: Option<u16>) -> Self {
        self.status_code = code;
        self
    }

    /// Attach error details.
    pub fn error(mut self, message: impl Into<String>, stack: Option<String>) -> Self {
        self.error_message = Some(message.into());
        self.error_stack = stack;
        self
    }

    /// Set request metrics.
    pub fn metrics(mut self, metrics: RequestMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Add metadata.
    pub fn metadata(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(json) = serde_json::to_value(value) {
            self.metadata.insert(key.into(), json);
        }
        self
    }

    /// Add a caller-supplied marker tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.extra_tags.push(tag.into());
        self
    }

    /// Set the priority.
    pub fn priority(mut self, priority: AuditPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Build the event stamped with the current time.
    pub fn build(self) -> AuditEvent {
        self.build_at(Utc::now())
    }

    /// Build the event stamped with `timestamp`.
    pub fn build_at(self, timestamp: DateTime<Utc>) -> AuditEvent {
        let tags = derive_tags(self.action, self.outcome, self.priority, &self.extra_tags);
        AuditEvent {
            id: AuditEventId::new(),
            timestamp,
            action: self.action,
            actor: self.actor,
            session_id: self.session_id,
            resource: self.resource,
            request: self.request,
            change_set: self.change_set,
            outcome: self.outcome,
            status_code: self.status_code,
            error_message: self.error_message,
            error_stack: self.error_stack,
            metrics: self.metrics,
            metadata: self.metadata,
            tags,
            priority: self.priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_defaults() {
        let event = AuditEvent::builder(AuditAction::SystemStartup).build();
        assert_eq!(event.priority(), AuditPriority::Medium);
        assert_eq!(event.outcome(), AuditOutcome::Success);
        assert!(event.actor().is_none());
        assert!(event.has_tag("SYSTEM"));
        assert!(event.has_tag("MEDIUM"));
        assert!(event.has_tag("SUCCESS"));
        assert!(!event.requires_immediate_write());
    }

    #[test]
    fn test_immediate_write_policy() {
        let critical = AuditEvent::builder(AuditAction::SuspiciousActivity)
            .priority(AuditPriority::Critical)
            .build();
        assert!(critical.requires_immediate_write());

        let errored = AuditEvent::builder(AuditAction::ApiError)
            .outcome(AuditOutcome::Error)
            .priority(AuditPriority::Low)
            .build();
        assert!(errored.requires_immediate_write());

        let failed = AuditEvent::builder(AuditAction::LoginFailed)
            .outcome(AuditOutcome::Failure)
            .priority(AuditPriority::High)
            .build();
        assert!(!failed.requires_immediate_write());
    }

    #[test]
    fn test_changes_are_diffed() {
        let event = AuditEvent::builder(AuditAction::LandUpdate)
            .changes(Some(json!({"area": 10})), Some(json!({"area": 12})))
            .build();
        let set = event.change_set().unwrap();
        assert_eq!(set.changes, vec!["area: 10 → 12".to_string()]);
    }

    #[test]
    fn test_serde_roundtrip_preserves_tags() {
        let event = AuditEvent::builder(AuditAction::LoginFailed)
            .actor(AuditActor::user("u1").with_email("a@b.c"))
            .outcome(AuditOutcome::Failure)
            .priority(AuditPriority::High)
            .metadata("attempts", 3)
            .build();

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"action\":\"LOGIN_FAILED\""));
        let back: AuditEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_outcome_from_status() {
        assert_eq!(AuditOutcome::from_status(200), AuditOutcome::Success);
        assert_eq!(AuditOutcome::from_status(399), AuditOutcome::Success);
        assert_eq!(AuditOutcome::from_status(404), AuditOutcome::Failure);
    }

    #[test]
    fn test_method_parse_is_case_insensitive() {
        assert_eq!("post".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
    }
}
