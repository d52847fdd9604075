//! Cache configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (CHAINCACHE_*)
//! 2. TOML config file (if CHAINCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// What to do when an existing partition file does not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorruptPolicy {
    /// Fail the `get`/`set` that first touches the partition.
    #[default]
    Fail,
    /// Move the file aside to `<partition>.json.corrupt` and start empty.
    Reset,
}

/// Cache configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (CHAINCACHE_*)
/// 2. TOML config file (if CHAINCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding one subdirectory per namespace.
    ///
    /// Set via CHAINCACHE_ROOT_DIR environment variable.
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Quiet window before a dirty partition is written, in milliseconds.
    ///
    /// Set via CHAINCACHE_DEBOUNCE_MS environment variable.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Handling of partition files that fail to parse.
    ///
    /// Set via CHAINCACHE_ON_CORRUPT environment variable (`fail` or `reset`).
    #[serde(default)]
    pub on_corrupt: CorruptPolicy,
}

fn default_root_dir() -> PathBuf {
    PathBuf::from("cache/discovery")
}

fn default_debounce_ms() -> u64 {
    100
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { root_dir: default_root_dir(), debounce_ms: default_debounce_ms(), on_corrupt: CorruptPolicy::Fail }
    }
}

impl CacheConfig {
    /// Debounce window as Duration for use with tokio timers.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Same configuration rooted at a different directory.
    pub fn with_root_dir(mut self, root_dir: impl Into<PathBuf>) -> Self {
        self.root_dir = root_dir.into();
        self
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `CHAINCACHE_`
    /// 2. TOML file from `CHAINCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("CHAINCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("CHAINCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
