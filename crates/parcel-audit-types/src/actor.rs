//! Audit event actors.

use serde::{Deserialize, Serialize};

/// The authenticated user that initiated an audit event.
///
/// System-originated events carry no actor at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditActor {
    /// Opaque user identifier.
    pub user_id: String,
    /// User email, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// User role, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl AuditActor {
    /// Create a user actor.
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
            role: None,
        }
    }

    /// Add an email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Add a role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Get a display identifier for this actor.
    pub fn identifier(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.user_id)
    }
}
