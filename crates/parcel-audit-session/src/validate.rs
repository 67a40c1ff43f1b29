//! Session validity rules.

use crate::state::SessionState;
use chrono::{DateTime, Duration, Utc};
use parcel_common_config::{SessionConfig, MAX_SESSION_SECS};
use std::fmt;

/// Inactivity thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Inactivity after which a session is expired.
    pub max_age: Duration,
    /// Inactivity after which the caller is warned.
    pub warning_after: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

/// Windows longer than [`MAX_SESSION_SECS`] are clamped to it.
impl From<&SessionConfig> for SessionPolicy {
    fn from(config: &SessionConfig) -> Self {
        let secs = |value: u64| Duration::seconds(value.min(MAX_SESSION_SECS) as i64);
        Self {
            max_age: secs(config.max_age_secs),
            warning_after: secs(config.warning_secs),
        }
    }
}

/// Why a session was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidReason {
    /// No session, or no signed-in user on it.
    NoActiveSession,
    /// Inactive for longer than the maximum age.
    Expired,
    /// Required fields are missing.
    Malformed,
}

impl InvalidReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoActiveSession => "no active session",
            Self::Expired => "expired",
            Self::Malformed => "malformed",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of checking a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionDecision {
    Valid {
        /// Inactivity passed the warning threshold.
        expiring_soon: bool,
    },
    Invalid(InvalidReason),
}

impl SessionDecision {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    pub fn reason(&self) -> Option<InvalidReason> {
        match self {
            Self::Valid { .. } => None,
            Self::Invalid(reason) => Some(*reason),
        }
    }

    pub fn expiring_soon(&self) -> bool {
        matches!(self, Self::Valid { expiring_soon: true })
    }
}

/// Check a session against the policy. Pure; callers apply side effects.
///
/// Rules apply in order: a missing session or user gives
/// [`InvalidReason::NoActiveSession`]; inactivity strictly beyond
/// `max_age` gives [`InvalidReason::Expired`]; a missing user field or
/// activity stamp gives [`InvalidReason::Malformed`].
pub fn validate(
    session: Option<&SessionState>,
    policy: &SessionPolicy,
    now: DateTime<Utc>,
) -> SessionDecision {
    let Some(session) = session else {
        return SessionDecision::Invalid(InvalidReason::NoActiveSession);
    };
    let Some(user) = &session.user else {
        return SessionDecision::Invalid(InvalidReason::NoActiveSession);
    };

    let inactivity = session.inactivity(now);
    if inactivity.is_some_and(|age| age > policy.max_age) {
        return SessionDecision::Invalid(InvalidReason::Expired);
    }

    let Some(inactivity) = inactivity else {
        return SessionDecision::Invalid(InvalidReason::Malformed);
    };
    if !user.is_complete() {
        return SessionDecision::Invalid(InvalidReason::Malformed);
    }

    SessionDecision::Valid {
        expiring_soon: inactivity > policy.warning_after,
    }
}
