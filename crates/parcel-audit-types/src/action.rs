//! Audit event actions.

use crate::AuditCategory;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Specific actions that can be audited.
///
/// The set is closed; the wire form is `SCREAMING_SNAKE_CASE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Display, EnumIter, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    // Authentication
    UserSignup,
    UserSignin,
    UserSignout,
    PasswordChange,
    PasswordReset,

    // Session
    SessionCreate,
    SessionDestroy,
    SessionExpire,

    // User management
    UserCreate,
    UserUpdate,
    UserDelete,
    UserProfileUpdate,

    // Land
    LandCreate,
    LandUpdate,
    LandDelete,
    LandView,

    // Listing
    ListingCreate,
    ListingUpdate,
    ListingDelete,
    ListingView,
    ListingApprove,
    ListingReject,

    // Transaction
    TransactionCreate,
    TransactionUpdate,
    TransactionDelete,
    TransactionApprove,
    TransactionReject,
    TransactionComplete,

    // System
    SystemStartup,
    SystemShutdown,
    SystemError,
    SystemWarning,
    SessionCleanup,
    DatabaseBackup,
    DatabaseRestore,

    // Admin
    AdminLogin,
    AdminAction,
    UserForceLogout,
    SystemMaintenance,

    // File operations
    FileUpload,
    FileDelete,
    FileDownload,
    FileView,

    // API
    ApiRequest,
    ApiResponse,
    ApiError,

    // Security
    LoginAttempt,
    LoginFailed,
    UnauthorizedAccess,
    RateLimitExceeded,
    SuspiciousActivity,
    AccountLocked,
    AccountUnlocked,
}

impl AuditAction {
    /// Get the category this action belongs to.
    pub fn category(&self) -> AuditCategory {
        match self {
            Self::UserSignup
            | Self::UserSignin
            | Self::UserSignout
            | Self::PasswordChange
            | Self::PasswordReset => AuditCategory::Authentication,

            Self::SessionCreate | Self::SessionDestroy | Self::SessionExpire => {
                AuditCategory::Session
            }

            Self::UserCreate | Self::UserUpdate | Self::UserDelete | Self::UserProfileUpdate => {
                AuditCategory::UserManagement
            }

            Self::LandCreate | Self::LandUpdate | Self::LandDelete | Self::LandView => {
                AuditCategory::LandManagement
            }

            Self::ListingCreate
            | Self::ListingUpdate
            | Self::ListingDelete
            | Self::ListingView
            | Self::ListingApprove
            | Self::ListingReject => AuditCategory::ListingManagement,

            Self::TransactionCreate
            | Self::TransactionUpdate
            | Self::TransactionDelete
            | Self::TransactionApprove
            | Self::TransactionReject
            | Self::TransactionComplete => AuditCategory::TransactionManagement,

            Self::SystemStartup
            | Self::SystemShutdown
            | Self::SystemError
            | Self::SystemWarning
            | Self::SessionCleanup
            | Self::DatabaseBackup
            | Self::DatabaseRestore => AuditCategory::System,

            Self::AdminLogin
            | Self::AdminAction
            | Self::UserForceLogout
            | Self::SystemMaintenance => AuditCategory::Admin,

            Self::FileUpload | Self::FileDelete | Self::FileDownload | Self::FileView => {
                AuditCategory::FileOperations
            }

            Self::ApiRequest | Self::ApiResponse | Self::ApiError => AuditCategory::Api,

            Self::LoginAttempt
            | Self::LoginFailed
            | Self::UnauthorizedAccess
            | Self::RateLimitExceeded
            | Self::SuspiciousActivity
            | Self::AccountLocked
            | Self::AccountUnlocked => AuditCategory::Security,
        }
    }

    /// Get all actions.
    pub fn all() -> impl Iterator<Item = Self> {
        use strum::IntoEnumIterator;
        Self::iter()
    }
}
