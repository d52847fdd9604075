//! Configuration validation rules.
//!
//! This module provides validation logic for `CacheConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::CacheConfig;
use thiserror::Error;

/// Longest accepted debounce window.
const MAX_DEBOUNCE_MS: u64 = 60_000;

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

impl CacheConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `root_dir` is empty and
    /// `ConfigError::Invalid` if `debounce_ms` exceeds one minute.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root_dir.as_os_str().is_empty() {
            return Err(ConfigError::Missing {
                field: "root_dir".into(),
                hint: "Set CHAINCACHE_ROOT_DIR or root_dir in the config file".into(),
            });
        }

        if self.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(ConfigError::Invalid {
                field: "debounce_ms".into(),
                reason: "must not exceed 1 minute (60000ms)".into(),
            });
        }

        if self.debounce_ms == 0 {
            tracing::warn!("debounce_ms is 0; every set schedules its own write");
        }

        Ok(())
    }
}
