//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `MARKETPLACE_DATA_DIR` - Directory holding device storage (default: `.marketplace`)
//! - `MARKETPLACE_STORAGE_KEY` - Key the cart is stored under, at most 184 bytes (default: `@GoMarketplace:products`)
//! - `MARKETPLACE_LOG_FORMAT` - `pretty` or `json` (default: `pretty`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::str::FromStr;

use marketplace_core::CART_STORAGE_KEY;
use thiserror::Error;

use crate::storage::FileStorage;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("expected 'pretty' or 'json', got '{other}'")),
        }
    }
}

/// Cart application configuration.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Directory backing [`FileStorage`](crate::FileStorage)
    pub data_dir: PathBuf,
    /// Storage key for the serialized cart
    pub storage_key: String,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "production", "preview")
    pub sentry_environment: Option<String>,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".marketplace"),
            storage_key: CART_STORAGE_KEY.to_string(),
            log_format: LogFormat::default(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let data_dir = lookup("MARKETPLACE_DATA_DIR").map_or(defaults.data_dir, PathBuf::from);

        let storage_key = lookup("MARKETPLACE_STORAGE_KEY").unwrap_or(defaults.storage_key);
        if storage_key.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "MARKETPLACE_STORAGE_KEY".to_string(),
                "must not be empty".to_string(),
            ));
        }
        if storage_key.len() > FileStorage::MAX_KEY_LEN {
            return Err(ConfigError::InvalidEnvVar(
                "MARKETPLACE_STORAGE_KEY".to_string(),
                format!("must be at most {} bytes", FileStorage::MAX_KEY_LEN),
            ));
        }

        let log_format = match lookup("MARKETPLACE_LOG_FORMAT") {
            Some(value) => value.parse::<LogFormat>().map_err(|e| {
                ConfigError::InvalidEnvVar("MARKETPLACE_LOG_FORMAT".to_string(), e)
            })?,
            None => defaults.log_format,
        };

        Ok(Self {
            data_dir,
            storage_key,
            log_format,
            sentry_dsn: lookup("SENTRY_DSN").filter(|dsn| !dsn.is_empty()),
            sentry_environment: lookup("SENTRY_ENVIRONMENT"),
        })
    }
}
