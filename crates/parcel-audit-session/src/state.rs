//! Session records.

use chrono::{DateTime, Duration, Utc};
use parcel_audit_types::AuditActor;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Opaque session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Authenticated user as stored in a session.
///
/// Every field is optional so that sessions written by older or foreign
/// code can still be loaded and rejected as malformed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
}

impl SessionUser {
    /// User with every required field set.
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        name: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            email: Some(email.into()),
            name: Some(name.into()),
            role: Some(role.into()),
        }
    }

    /// Check that id, email, name and role are present and non-empty.
    pub fn is_complete(&self) -> bool {
        [&self.id, &self.email, &self.name, &self.role]
            .iter()
            .all(|field| field.as_deref().is_some_and(|v| !v.is_empty()))
    }

    /// Audit actor for this user, if it has an id.
    pub fn actor(&self) -> Option<AuditActor> {
        let mut actor = AuditActor::user(self.id.clone()?);
        actor.email = self.email.clone();
        actor.role = self.role.clone();
        Some(actor)
    }
}

/// Server-side state of one browsing session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub user: Option<SessionUser>,
    pub login_time: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
    pub visit_count: u32,
    #[serde(default)]
    pub preferences: BTreeMap<String, Value>,
}

impl SessionState {
    /// Fresh session for a user who just authenticated.
    pub fn for_user(user: SessionUser, now: DateTime<Utc>) -> Self {
        Self {
            user: Some(user),
            login_time: Some(now),
            last_activity: Some(now),
            visit_count: 1,
            preferences: BTreeMap::new(),
        }
    }

    /// Id of the signed-in user.
    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref()?.id.as_deref()
    }

    /// Time since the last validated request.
    pub fn inactivity(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.last_activity.map(|at| now - at)
    }

    /// Record a validated request.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = Some(now);
        self.visit_count = self.visit_count.saturating_add(1);
    }

    /// Instant at which the session lapses without further activity.
    pub fn expires_at(&self, max_age: Duration) -> Option<DateTime<Utc>> {
        self.last_activity.map(|at| at + max_age)
    }
}

/// Listing entry for one of a user's sessions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub expires: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
    pub login_time: Option<DateTime<Utc>>,
    pub visit_count: u32,
}

/// Session counts at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub total: usize,
    pub active: usize,
    pub expired: usize,
}
