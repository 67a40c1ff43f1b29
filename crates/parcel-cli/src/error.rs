//! CLI error handling.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use parcel_audit_query::QueryError;
use parcel_audit_store::StoreError;
use parcel_common_config::{ConfigError, EnvError};
use parcel_common_log::LogError;
use thiserror::Error;

/// CLI error type with context for the operator.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        hint: Option<String>,
    },

    #[error("{message}")]
    Io {
        message: String,
        #[source]
        source: io::Error,
        path: Option<PathBuf>,
    },

    #[error("{message}")]
    Validation { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    Store {
        message: String,
        #[source]
        source: Option<StoreError>,
    },

    #[error("interrupted")]
    Interrupted,

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Stable error code shown next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "E001",
            Self::Io { .. } => "E002",
            Self::Validation { .. } => "E004",
            Self::NotFound { .. } => "E005",
            Self::Store { .. } => "E006",
            Self::Interrupted => "E130",
            Self::Other(_) => "E999",
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> ExitCode {
        let code = match self {
            Self::Config { .. } => 2,
            Self::Io { .. } => 3,
            Self::Store { .. } => 4,
            Self::Validation { .. } => 5,
            Self::NotFound { .. } => 6,
            Self::Interrupted => 130,
            Self::Other(_) => 1,
        };
        ExitCode::from(code)
    }

    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Config { hint, .. } => hint.as_deref(),
            _ => None,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
            hint: None,
        }
    }

    /// Create an IO error tied to a path.
    pub fn io_with_path(message: impl Into<String>, source: io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            message: message.into(),
            source,
            path: Some(path.into()),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: err,
            path: None,
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation {
            message: format!("Invalid JSON: {err}"),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config {
            message: format!("Configuration error: {err}"),
            source: Some(Box::new(err)),
            hint: Some("Check parcel.yaml and the AUDIT_* environment variables".to_string()),
        }
    }
}

impl From<EnvError> for CliError {
    fn from(err: EnvError) -> Self {
        ConfigError::from(err).into()
    }
}

impl From<LogError> for CliError {
    fn from(err: LogError) -> Self {
        Self::Config {
            message: format!("Logging setup failed: {err}"),
            source: Some(Box::new(err)),
            hint: Some("Check PARCEL_LOG_FILE points to a writable location".to_string()),
        }
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        Self::Store {
            message: format!("Audit store error: {err}"),
            source: Some(err),
        }
    }
}

impl From<QueryError> for CliError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Validation(message) => Self::Validation { message },
            QueryError::NotFound(id) => Self::NotFound {
                message: format!("Audit log not found: {id}"),
            },
            QueryError::Store(err) => err.into(),
            QueryError::Export(err) => Self::Io {
                message: format!("Export failed: {err}"),
                source: io::Error::new(io::ErrorKind::Other, err.to_string()),
                path: None,
            },
        }
    }
}
