//! Request observation.
//!
//! The HTTP layer describes each finished exchange with a
//! [`RequestDescriptor`] and a [`ResponseDescriptor`]; observers turn that
//! into zero or more audit events.

use crate::events::{self, CallContext, FileInfo};
use parcel_audit_types::{
    AuditAction, AuditActor, AuditEvent, AuditOutcome, AuditPriority, HttpMethod, RequestContext,
    ResourceType,
};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// Headers whose values never reach the audit log.
pub const SENSITIVE_HEADERS: [&str; 3] = ["authorization", "cookie", "x-api-key"];

/// Placeholder for sensitive header values.
pub const REDACTED: &str = "[REDACTED]";

/// Inbound request as seen by the HTTP layer.
#[derive(Debug, Clone, Default)]
pub struct RequestDescriptor {
    pub method: Option<HttpMethod>,
    pub endpoint: String,
    /// Address of the connected peer.
    pub peer_ip: Option<String>,
    /// Header map with lowercase names.
    pub headers: BTreeMap<String, String>,
    /// Authenticated user, if any.
    pub user: Option<AuditActor>,
    pub session_id: Option<String>,
    pub query: BTreeMap<String, String>,
    pub content_length: Option<u64>,
    /// Uploaded file, for file routes.
    pub file: Option<FileInfo>,
}

impl RequestDescriptor {
    /// Create a descriptor for `method endpoint`.
    pub fn new(method: HttpMethod, endpoint: impl Into<String>) -> Self {
        Self {
            method: Some(method),
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Add a header; the name is lowercased.
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn user(mut self, user: AuditActor) -> Self {
        self.user = Some(user);
        self
    }

    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn peer(mut self, ip: impl Into<String>) -> Self {
        self.peer_ip = Some(ip.into());
        self
    }

    /// Resolve the client address.
    ///
    /// Order: peer address, first `x-forwarded-for` entry, `x-real-ip`,
    /// then `"unknown"`.
    pub fn client_ip(&self) -> String {
        self.peer_ip
            .clone()
            .filter(|ip| !ip.is_empty())
            .or_else(|| {
                self.headers
                    .get("x-forwarded-for")
                    .and_then(|v| v.split(',').next())
                    .map(|ip| ip.trim().to_string())
                    .filter(|ip| !ip.is_empty())
            })
            .or_else(|| self.headers.get("x-real-ip").cloned())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Headers with credentials replaced by [`REDACTED`].
    pub fn sanitized_headers(&self) -> BTreeMap<String, String> {
        self.headers
            .iter()
            .map(|(name, value)| {
                let value = if SENSITIVE_HEADERS.contains(&name.as_str()) {
                    REDACTED.to_string()
                } else {
                    value.clone()
                };
                (name.clone(), value)
            })
            .collect()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.headers.get("user-agent").map(String::as_str)
    }

    /// Request context recorded on events.
    pub fn context(&self) -> RequestContext {
        RequestContext {
            method: self.method,
            endpoint: Some(self.endpoint.clone()),
            ip_address: Some(self.client_ip()),
            user_agent: self.user_agent().map(str::to_string),
        }
    }

    fn call_context(&self, user: Option<AuditActor>, status_code: u16) -> CallContext {
        CallContext {
            actor: user,
            session_id: self.session_id.clone(),
            request: Some(self.context()),
            status_code: Some(status_code),
        }
    }
}

/// Finalised response as seen by the HTTP layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseDescriptor {
    pub status_code: u16,
    pub content_length: Option<u64>,
    /// User returned in the body (`data.user`).
    pub body_user: Option<AuditActor>,
    /// `error` field of the body.
    pub body_error: Option<String>,
    /// `message` field of the body.
    pub body_message: Option<String>,
    /// `data` field of the body.
    pub body_data: Option<Value>,
}

impl ResponseDescriptor {
    /// Response without an inspectable body.
    pub fn status(status_code: u16) -> Self {
        Self {
            status_code,
            ..Default::default()
        }
    }

    /// Describe a JSON response of the shape `{data, error, message}`.
    pub fn from_json(status_code: u16, body: &Value) -> Self {
        let text = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_string);
        let data = body.get("data").filter(|d| !d.is_null()).cloned();
        let body_user = data
            .as_ref()
            .and_then(|d| d.get("user"))
            .and_then(actor_from_json);

        Self {
            status_code,
            content_length: None,
            body_user,
            body_error: text("error"),
            body_message: text("message"),
            body_data: data,
        }
    }

    /// Outcome implied by the status code.
    pub fn outcome(&self) -> AuditOutcome {
        AuditOutcome::from_status(self.status_code)
    }
}

fn actor_from_json(user: &Value) -> Option<AuditActor> {
    let id = user
        .get("_id")
        .or_else(|| user.get("id"))
        .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))?;
    let mut actor = AuditActor::user(id);
    if let Some(email) = user.get("email").and_then(Value::as_str) {
        actor = actor.with_email(email);
    }
    if let Some(role) = user.get("role").and_then(Value::as_str) {
        actor = actor.with_role(role);
    }
    Some(actor)
}

/// Turns a finished exchange into audit events.
pub trait RequestObserver: Send + Sync {
    fn observe(
        &self,
        request: &RequestDescriptor,
        response: &ResponseDescriptor,
        elapsed: Duration,
    ) -> Vec<AuditEvent>;
}

/// Records every request as `API_REQUEST`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiRequestObserver;

impl RequestObserver for ApiRequestObserver {
    fn observe(
        &self,
        request: &RequestDescriptor,
        response: &ResponseDescriptor,
        elapsed: Duration,
    ) -> Vec<AuditEvent> {
        let ctx = request.call_context(request.user.clone(), response.status_code);
        let details = json!({
            "query": request.query,
            "headers": request.sanitized_headers(),
        });
        vec![events::api_request(
            &ctx,
            elapsed,
            response.outcome(),
            request.content_length,
            response.content_length,
            details,
        )]
    }
}

/// Records authentication routes.
///
/// The acting user is taken from the response body, since the request is
/// not authenticated yet on sign-in.
#[derive(Debug, Clone, Copy)]
pub struct AuthObserver {
    pub action: AuditAction,
}

impl RequestObserver for AuthObserver {
    fn observe(
        &self,
        request: &RequestDescriptor,
        response: &ResponseDescriptor,
        _elapsed: Duration,
    ) -> Vec<AuditEvent> {
        let ctx = request.call_context(response.body_user.clone(), response.status_code);
        vec![events::auth(
            self.action,
            &ctx,
            response.outcome(),
            response.body_error.as_deref(),
        )]
    }
}

/// Records create/update/delete routes for a domain entity.
#[derive(Debug, Clone, Copy)]
pub struct CrudObserver {
    pub action: AuditAction,
    pub resource_type: ResourceType,
}

impl RequestObserver for CrudObserver {
    fn observe(
        &self,
        request: &RequestDescriptor,
        response: &ResponseDescriptor,
        _elapsed: Duration,
    ) -> Vec<AuditEvent> {
        if !matches!(
            self.resource_type,
            ResourceType::User | ResourceType::Land | ResourceType::Listing | ResourceType::Transaction
        ) {
            return Vec::new();
        }

        let ctx = request.call_context(request.user.clone(), response.status_code);
        let entity = response.body_data.clone().unwrap_or(Value::Null);
        let resource = events::resource_from_entity(self.resource_type, &entity);
        let after = response.body_data.clone();

        vec![events::mutation_with_outcome(
            self.action,
            &ctx,
            resource,
            None,
            after,
            response.outcome(),
        )]
    }
}

/// Records file routes.
#[derive(Debug, Clone, Copy)]
pub struct FileObserver {
    pub action: AuditAction,
}

impl RequestObserver for FileObserver {
    fn observe(
        &self,
        request: &RequestDescriptor,
        response: &ResponseDescriptor,
        _elapsed: Duration,
    ) -> Vec<AuditEvent> {
        let ctx = request.call_context(request.user.clone(), response.status_code);
        let file = request.file.clone().unwrap_or_default();
        vec![events::file(
            self.action,
            &ctx,
            &file,
            response.outcome(),
            response.body_error.as_deref(),
        )]
    }
}

/// Records security-sensitive routes.
#[derive(Debug, Clone, Copy)]
pub struct SecurityObserver {
    pub action: AuditAction,
}

impl RequestObserver for SecurityObserver {
    fn observe(
        &self,
        request: &RequestDescriptor,
        response: &ResponseDescriptor,
        _elapsed: Duration,
    ) -> Vec<AuditEvent> {
        let ctx = request.call_context(request.user.clone(), response.status_code);
        let mut details = Map::new();
        if let Some(error) = &response.body_error {
            details.insert("error".into(), json!(error));
        }
        if let Some(message) = &response.body_message {
            details.insert("message".into(), json!(message));
        }
        vec![events::security(
            self.action,
            &ctx,
            Value::Object(details),
            AuditPriority::High,
        )]
    }
}
