//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Explicit overrides (CLI flags)
//! 2. Environment variables (LASTMOD_*)
//! 3. The `[lastmod]` section of a TOML config file
//! 4. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Name of the TOML table holding lastmod settings.
pub const SECTION: &str = "lastmod";

/// Environment variable naming a config file when none is passed explicitly.
pub const CONFIG_FILE_ENV: &str = "LASTMOD_CONFIG_FILE";

/// Archive formats reserved for payload compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZipFormat {
    Zip,
    Tar,
    Gztar,
    Bztar,
    Xztar,
}

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Parent directory for stored payload files. Required.
    ///
    /// Set via LASTMOD_CACHE_PATH environment variable.
    #[serde(default)]
    pub cache_path: Option<PathBuf>,

    /// Path to the SQLite metadata database. Required.
    ///
    /// Set via LASTMOD_DB environment variable.
    #[serde(default)]
    pub db: Option<PathBuf>,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to accept for a single response body.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Reserved: revalidate with entity tags. Currently has no effect.
    #[serde(default)]
    pub use_etags: bool,

    /// Reserved: upper bound on total cached bytes. Currently has no effect.
    #[serde(default)]
    pub size_limit: Option<u64>,

    /// Reserved: compression format for stored payloads. Currently has no effect.
    #[serde(default)]
    pub zip_format: Option<ZipFormat>,
}

fn default_user_agent() -> String {
    concat!("lastmod/", env!("CARGO_PKG_VERSION")).into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    50 * 1024 * 1024
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_path: None,
            db: None,
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            use_etags: false,
            size_limit: None,
            zip_format: None,
        }
    }
}

/// Values that take precedence over every other configuration source.
///
/// `None` fields leave the lower layers untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db: Option<PathBuf>,
}

impl AppConfig {
    /// Build a config directly from the two required paths.
    pub fn new(cache_path: impl Into<PathBuf>, db: impl Into<PathBuf>) -> Self {
        Self { cache_path: Some(cache_path.into()), db: Some(db.into()), ..Default::default() }
    }

    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from file and environment.
    ///
    /// See [`AppConfig::load_with`].
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(config_file, &ConfigOverrides::default())
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. `overrides`
    /// 2. Environment variables prefixed with `LASTMOD_`
    /// 3. The `[lastmod]` table of `config_file`, or of the file named by
    ///    `LASTMOD_CONFIG_FILE` when `config_file` is `None`
    /// 4. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The named configuration file does not exist or cannot be parsed
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load_with(config_file: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        let config_file = config_file
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_FILE_ENV).map(PathBuf::from));

        if let Some(path) = config_file {
            if !path.is_file() {
                return Err(ConfigError::LoadFailed(format!("config file not found: {}", path.display())));
            }
            tracing::debug!(path = %path.display(), "loading config file");
            figment = figment.merge(Toml::file(&path).nested());
        }

        figment = figment
            .merge(
                Env::prefixed("LASTMOD_")
                    .map(|key| key.as_str().to_lowercase().into())
                    .global(),
            )
            .merge(Serialized::globals(overrides))
            .select(SECTION);

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
