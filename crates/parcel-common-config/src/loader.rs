//! Configuration file loading and parsing.

use crate::env::EnvError;
use crate::types::{ParcelConfig, MAX_SESSION_SECS};
use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {source}")]
    ReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("invalid YAML at line {}: {message}", line.map(|l| l.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    ParseError { line: Option<usize>, message: String },

    #[error("validation error: {message}")]
    ValidationError { message: String },

    #[error("environment variable not found: {var}")]
    EnvVarNotFound { var: String },

    #[error(transparent)]
    Env(#[from] EnvError),
}

/// Configuration loader.
///
/// Resolution order: built-in defaults, then the YAML file (if present),
/// then environment overrides. The result is validated before returning.
pub struct ConfigLoader {
    path: PathBuf,
}

impl ConfigLoader {
    /// Create a loader for the given YAML file.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the YAML file this loader reads.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load, apply environment overrides, and validate.
    pub fn load(&self) -> Result<ParcelConfig, ConfigError> {
        let mut config = self.load_file()?;
        config.apply_env()?;
        validate(&config)?;
        Ok(config)
    }

    /// Load the YAML file alone; a missing file yields defaults.
    pub fn load_file(&self) -> Result<ParcelConfig, ConfigError> {
        if !self.path.exists() {
            return Ok(ParcelConfig::default());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let expanded = expand_env_vars(&contents, |var| std::env::var(var).ok())?;
        parse_yaml(&expanded)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        let path = std::env::var(crate::env::vars::PARCEL_CONFIG_PATH)
            .unwrap_or_else(|_| "parcel.yaml".to_string());
        Self::new(path)
    }
}

/// Parse configuration YAML.
pub fn parse_yaml(contents: &str) -> Result<ParcelConfig, ConfigError> {
    serde_yaml::from_str(contents).map_err(|e| ConfigError::ParseError {
        line: e.location().map(|l| l.line()),
        message: e.to_string(),
    })
}

/// Expand `${VAR}` and `${VAR:-default}` references.
pub fn expand_env_vars<F>(content: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = content.to_string();
    let re = Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}").map_err(|e| ConfigError::ParseError {
        line: None,
        message: e.to_string(),
    })?;

    for cap in re.captures_iter(content) {
        let full_match = &cap[0];
        let var_name = &cap[1];
        let default = cap.get(2).map(|m| m.as_str());

        let value = match (lookup(var_name), default) {
            (Some(v), _) => v,
            (None, Some(d)) => d.to_string(),
            (None, None) => {
                return Err(ConfigError::EnvVarNotFound {
                    var: var_name.to_string(),
                })
            }
        };

        result = result.replace(full_match, &value);
    }

    Ok(result)
}

/// Validate configuration values.
pub fn validate(config: &ParcelConfig) -> Result<(), ConfigError> {
    let invalid = |message: &str| {
        Err(ConfigError::ValidationError {
            message: message.to_string(),
        })
    };

    if config.audit.batch_size == 0 {
        return invalid("audit.batch_size must be greater than 0");
    }
    if config.audit.batch_timeout_ms == 0 {
        return invalid("audit.batch_timeout_ms must be greater than 0");
    }
    if config.audit.write_timeout_ms == 0 {
        return invalid("audit.write_timeout_ms must be greater than 0");
    }
    if config.audit.retention_days == 0 {
        return invalid("audit.retention_days must be greater than 0");
    }
    if config.session.max_age_secs == 0 {
        return invalid("session.max_age_secs must be greater than 0");
    }
    if config.session.max_age_secs > MAX_SESSION_SECS {
        return invalid("session.max_age_secs must not exceed one year");
    }
    if config.session.warning_secs >= config.session.max_age_secs {
        return invalid("session.warning_secs must be less than session.max_age_secs");
    }

    Ok(())
}
