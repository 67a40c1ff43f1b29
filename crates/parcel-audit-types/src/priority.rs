//! Audit event priority and recording levels.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use strum::{Display, EnumString};

/// Priority classification for audit events.
///
/// `Critical` events bypass batching and are written immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditPriority {
    /// Routine high-volume events (API calls).
    Low,
    /// Normal operations.
    Medium,
    /// Failures and security-relevant operations.
    High,
    /// Alarms that must never sit in a buffer.
    Critical,
}

impl AuditPriority {
    /// Numeric value for comparison (higher = more severe).
    pub fn rank(&self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Critical => 3,
        }
    }

    /// Recording level this priority is logged at.
    pub fn level(&self) -> AuditLevel {
        match self {
            Self::Low | Self::Medium => AuditLevel::Info,
            Self::High => AuditLevel::Warn,
            Self::Critical => AuditLevel::Error,
        }
    }
}

impl PartialOrd for AuditPriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AuditPriority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl Default for AuditPriority {
    fn default() -> Self {
        Self::Medium
    }
}

/// Minimum recording level for the audit pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl AuditLevel {
    /// Parse from string, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Check if a priority meets this threshold.
    pub fn admits(&self, priority: AuditPriority) -> bool {
        priority.level() >= *self
    }
}
