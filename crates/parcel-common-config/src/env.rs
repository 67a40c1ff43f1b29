//! Environment variable handling.

use std::env;
use std::str::FromStr;
use thiserror::Error;

/// Environment variable errors.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("required environment variable not set: {var}")]
    NotSet { var: String },

    #[error("invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("failed to load .env file: {0}")]
    DotenvError(#[from] dotenvy::Error),
}

/// Environment variable names.
pub mod vars {
    // Audit pipeline
    pub const AUDIT_LOGGING_ENABLED: &str = "AUDIT_LOGGING_ENABLED";
    pub const AUDIT_LOG_LEVEL: &str = "AUDIT_LOG_LEVEL";
    pub const AUDIT_LOG_BATCH_SIZE: &str = "AUDIT_LOG_BATCH_SIZE";
    pub const AUDIT_LOG_BATCH_TIMEOUT: &str = "AUDIT_LOG_BATCH_TIMEOUT";
    pub const AUDIT_LOG_RETENTION_DAYS: &str = "AUDIT_LOG_RETENTION_DAYS";
    pub const AUDIT_STORE_WRITE_TIMEOUT_MS: &str = "AUDIT_STORE_WRITE_TIMEOUT_MS";
    pub const AUDIT_DATABASE_PATH: &str = "AUDIT_DATABASE_PATH";

    // Sessions
    pub const SESSION_MAX_AGE_SECS: &str = "SESSION_MAX_AGE_SECS";
    pub const SESSION_WARNING_SECS: &str = "SESSION_WARNING_SECS";

    // Deployment
    pub const PARCEL_CONFIG_PATH: &str = "PARCEL_CONFIG_PATH";
    pub const APP_ENV: &str = "APP_ENV";
}

/// Environment configuration.
pub struct Environment {
    _guard: (),
}

impl Environment {
    /// Initialize environment from .env files.
    ///
    /// Files are loaded in order `.env`, `.env.local`, `.env.<APP_ENV>`.
    /// Variables already set in the process are never overwritten.
    pub fn init() -> Result<Self, EnvError> {
        let _ = dotenvy::from_filename(".env");
        let _ = dotenvy::from_filename(".env.local");

        if let Ok(env) = env::var(vars::APP_ENV) {
            let _ = dotenvy::from_filename(format!(".env.{}", env));
        }

        Ok(Self { _guard: () })
    }

    /// Get a required string variable.
    pub fn require(var: &str) -> Result<String, EnvError> {
        env::var(var).map_err(|_| EnvError::NotSet { var: var.to_string() })
    }

    /// Get an optional string variable.
    pub fn get(var: &str) -> Option<String> {
        env::var(var).ok()
    }

    /// Get a variable with a default value.
    pub fn get_or(var: &str, default: &str) -> String {
        env::var(var).unwrap_or_else(|_| default.to_string())
    }

    /// Get a numeric variable; unparseable values are an error.
    pub fn get_int<T: FromStr>(var: &str) -> Result<Option<T>, EnvError> {
        parse_int(var, env::var(var).ok())
    }

    /// Check if running in production mode.
    pub fn is_production() -> bool {
        env::var(vars::APP_ENV)
            .map(|v| v == "production")
            .unwrap_or(false)
    }
}

pub(crate) fn parse_int<T: FromStr>(var: &str, raw: Option<String>) -> Result<Option<T>, EnvError> {
    match raw {
        Some(v) => v.trim().parse().map(Some).map_err(|_| EnvError::InvalidValue {
            var: var.to_string(),
            message: format!("expected integer, got {:?}", v),
        }),
        None => Ok(None),
    }
}
