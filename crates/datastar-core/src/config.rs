//! Configuration for the protocol engine.
//!
//! [`DatastarConfig`] can be loaded from a YAML file or string. Every field
//! has a default matching the protocol constants, so an empty document is a
//! valid configuration. Environment variables override YAML values:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `DATASTAR_DEFAULT_RETRY_MS` | `default_retry_ms` |
//! | `DATASTAR_SIGNALS_QUERY_KEY` | `signals_query_key` |
//! | `DATASTAR_MAX_SIGNALS_BYTES` | `max_signals_bytes` |
//! | `DATASTAR_STREAM_BUFFER_BYTES` | `stream_buffer_bytes` |

use std::path::Path;
use std::time::Duration;

use datastar_types::consts::{DATASTAR_KEY, DEFAULT_RETRY_MS};
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override could not be parsed.
    #[error("invalid value for {key}: {message}")]
    Env {
        /// The environment variable name.
        key: &'static str,
        /// Why the value was rejected.
        message: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Protocol engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatastarConfig {
    /// Reconnect delay applied when an operation does not choose one.
    pub default_retry_ms: u64,

    /// Query-string key carrying signals on `GET` requests.
    pub signals_query_key: String,

    /// Largest request body accepted as signals.
    pub max_signals_bytes: usize,

    /// In-memory pipe capacity between a session and the response body.
    pub stream_buffer_bytes: usize,
}

impl Default for DatastarConfig {
    fn default() -> Self {
        Self {
            default_retry_ms: DEFAULT_RETRY_MS,
            signals_query_key: DATASTAR_KEY.to_owned(),
            max_signals_bytes: 1_048_576,
            stream_buffer_bytes: 65_536,
        }
    }
}

impl DatastarConfig {
    /// Load configuration from a YAML file at the given path, then apply
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Env`] if an override is malformed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Env`] if an override is malformed.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Override fields from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if a numeric override does not parse.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Override fields from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if a numeric override does not parse.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("DATASTAR_DEFAULT_RETRY_MS") {
            self.default_retry_ms = parse_number("DATASTAR_DEFAULT_RETRY_MS", &val)?;
        }
        if let Some(val) = lookup("DATASTAR_SIGNALS_QUERY_KEY") {
            if val.is_empty() {
                return Err(ConfigError::Env {
                    key: "DATASTAR_SIGNALS_QUERY_KEY",
                    message: String::from("must not be empty"),
                });
            }
            self.signals_query_key = val;
        }
        if let Some(val) = lookup("DATASTAR_MAX_SIGNALS_BYTES") {
            self.max_signals_bytes = parse_number("DATASTAR_MAX_SIGNALS_BYTES", &val)?;
        }
        if let Some(val) = lookup("DATASTAR_STREAM_BUFFER_BYTES") {
            self.stream_buffer_bytes = parse_number("DATASTAR_STREAM_BUFFER_BYTES", &val)?;
        }
        Ok(())
    }

    /// The default reconnect delay as a [`Duration`].
    pub const fn default_retry(&self) -> Duration {
        Duration::from_millis(self.default_retry_ms)
    }
}

fn parse_number<T>(key: &'static str, val: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    val.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        key,
        message: e.to_string(),
    })
}
