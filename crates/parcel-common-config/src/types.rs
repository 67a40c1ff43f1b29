//! Configuration types.

use crate::env::{parse_int, vars, EnvError};
use parcel_audit_types::AuditLevel;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParcelConfig {
    /// Audit pipeline configuration.
    pub audit: AuditConfig,
    /// Session lifecycle configuration.
    pub session: SessionConfig,
}

/// Longest session inactivity window accepted (one year, in seconds).
pub const MAX_SESSION_SECS: u64 = 366 * 24 * 60 * 60;

impl ParcelConfig {
    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), EnvError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), EnvError>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.audit.apply_overrides(&lookup)?;
        self.session.apply_overrides(&lookup)
    }
}

/// Audit pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Whether events are recorded at all.
    pub enabled: bool,
    /// Minimum recording level.
    pub min_level: AuditLevel,
    /// Pending events that trigger an immediate flush.
    pub batch_size: usize,
    /// Maximum time a batched event waits (ms).
    pub batch_timeout_ms: u64,
    /// Default retention for cleanup (days).
    pub retention_days: u32,
    /// Upper bound on a single store write (ms).
    pub write_timeout_ms: u64,
    /// SQLite database file.
    pub database_path: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_level: AuditLevel::Info,
            batch_size: 100,
            batch_timeout_ms: 5000,
            retention_days: 90,
            write_timeout_ms: 3000,
            database_path: PathBuf::from("audit.db"),
        }
    }
}

impl AuditConfig {
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    fn apply_overrides<F>(&mut self, lookup: &F) -> Result<(), EnvError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(vars::AUDIT_LOGGING_ENABLED) {
            self.enabled = !v.trim().eq_ignore_ascii_case("false");
        }
        if let Some(v) = lookup(vars::AUDIT_LOG_LEVEL) {
            self.min_level = AuditLevel::parse(v.trim()).ok_or_else(|| EnvError::InvalidValue {
                var: vars::AUDIT_LOG_LEVEL.to_string(),
                message: format!("unknown level {:?}", v),
            })?;
        }
        if let Some(v) = parse_int(vars::AUDIT_LOG_BATCH_SIZE, lookup(vars::AUDIT_LOG_BATCH_SIZE))? {
            self.batch_size = v;
        }
        if let Some(v) =
            parse_int(vars::AUDIT_LOG_BATCH_TIMEOUT, lookup(vars::AUDIT_LOG_BATCH_TIMEOUT))?
        {
            self.batch_timeout_ms = v;
        }
        if let Some(v) =
            parse_int(vars::AUDIT_LOG_RETENTION_DAYS, lookup(vars::AUDIT_LOG_RETENTION_DAYS))?
        {
            self.retention_days = v;
        }
        if let Some(v) = parse_int(
            vars::AUDIT_STORE_WRITE_TIMEOUT_MS,
            lookup(vars::AUDIT_STORE_WRITE_TIMEOUT_MS),
        )? {
            self.write_timeout_ms = v;
        }
        if let Some(v) = lookup(vars::AUDIT_DATABASE_PATH) {
            self.database_path = PathBuf::from(v);
        }
        Ok(())
    }
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Inactivity after which a session expires (seconds).
    pub max_age_secs: u64,
    /// Inactivity after which an expiry warning is raised (seconds).
    pub warning_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_age_secs: 3600,
            warning_secs: 3300,
        }
    }
}

impl SessionConfig {
    fn apply_overrides<F>(&mut self, lookup: &F) -> Result<(), EnvError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_int(vars::SESSION_MAX_AGE_SECS, lookup(vars::SESSION_MAX_AGE_SECS))? {
            self.max_age_secs = v;
        }
        if let Some(v) = parse_int(vars::SESSION_WARNING_SECS, lookup(vars::SESSION_WARNING_SECS))? {
            self.warning_secs = v;
        }
        Ok(())
    }
}
