//! Audit event categories.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// High-level category for audit events.
///
/// The category name doubles as the first tag on every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumIter, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditCategory {
    /// Sign up, sign in, sign out, password changes.
    Authentication,
    /// Session creation, destruction and expiry.
    Session,
    /// User record mutations.
    UserManagement,
    /// Land record mutations and views.
    LandManagement,
    /// Listing mutations and moderation.
    ListingManagement,
    /// Transaction lifecycle.
    TransactionManagement,
    /// Process lifecycle and maintenance.
    System,
    /// Administrative actions.
    Admin,
    /// File uploads, downloads and deletions.
    FileOperations,
    /// Request/response observation.
    Api,
    /// Suspicious activity, failed logins, lockouts.
    Security,
}

impl AuditCategory {
    /// Get all categories.
    pub fn all() -> impl Iterator<Item = Self> {
        use strum::IntoEnumIterator;
        Self::iter()
    }

    /// Check if this category requires elevated retention.
    pub fn requires_extended_retention(&self) -> bool {
        matches!(
            self,
            Self::Authentication | Self::Security | Self::Admin | Self::UserManagement
        )
    }
}
