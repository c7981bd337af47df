//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::path::Path;

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `cache_path` or `db` is unset, and
    /// `ConfigError::Invalid` if:
    /// - `cache_path` or `db` is an empty path
    /// - `max_bytes` is 0 or exceeds 1GiB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.require_cache_path()?;
        self.require_db()?;

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 1024 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 1GiB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.use_etags || self.size_limit.is_some() || self.zip_format.is_some() {
            tracing::warn!(
                use_etags = self.use_etags,
                size_limit = ?self.size_limit,
                zip_format = ?self.zip_format,
                "use_etags, size_limit and zip_format are reserved and currently have no effect"
            );
        }

        Ok(())
    }

    /// The payload root, or `ConfigError::Missing`.
    pub fn require_cache_path(&self) -> Result<&Path, ConfigError> {
        required(self.cache_path.as_deref(), "cache_path", "pass --cache-path or set LASTMOD_CACHE_PATH")
    }

    /// The metadata database path, or `ConfigError::Missing`.
    pub fn require_db(&self) -> Result<&Path, ConfigError> {
        required(self.db.as_deref(), "db", "pass --db or set LASTMOD_DB")
    }
}

fn required<'a>(value: Option<&'a Path>, field: &str, hint: &str) -> Result<&'a Path, ConfigError> {
    match value {
        None => Err(ConfigError::Missing {
            field: field.into(),
            hint: format!("{hint}, or add `{field}` to the [lastmod] section of the config file"),
        }),
        Some(path) if path.as_os_str().is_empty() => {
            Err(ConfigError::Invalid { field: field.into(), reason: "must not be empty".into() })
        }
        Some(path) => Ok(path),
    }
}
