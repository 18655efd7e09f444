//! Engine configuration
//!
//! Loaded from `.toml` or `.yaml`/`.yml` files, or built in code with the
//! `with_*` methods.

use crate::error::ConfigError;
use ecm_model::DEFAULT_JURISDICTION;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Jurisdiction used for store calls when a multiple carries none
    pub jurisdiction: String,
    /// Per-case assignment concurrency during creation (1 = sequential)
    pub max_concurrent_mutations: usize,
    /// Capacity of the propagation queue
    pub propagation_queue_capacity: usize,
    /// Maximum cached identities
    pub identity_cache_capacity: u64,
    /// Identity cache time-to-live in seconds
    pub identity_cache_ttl_secs: u64,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With mutation concurrency
    #[inline]
    #[must_use]
    pub fn with_max_concurrent_mutations(mut self, max: usize) -> Self {
        self.max_concurrent_mutations = max;
        self
    }

    /// With propagation queue capacity
    #[inline]
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.propagation_queue_capacity = capacity;
        self
    }

    /// With jurisdiction
    #[inline]
    #[must_use]
    pub fn with_jurisdiction(mut self, jurisdiction: impl Into<String>) -> Self {
        self.jurisdiction = jurisdiction.into();
        self
    }

    /// Identity cache TTL
    #[inline]
    #[must_use]
    pub fn identity_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.identity_cache_ttl_secs)
    }

    /// Load from file, format chosen by extension
    ///
    /// # Errors
    /// - `ConfigError::UnsupportedFormat` for unknown extensions
    /// - `ConfigError::Io` if the file cannot be read
    /// - `ConfigError::Parse` / `ConfigError::InvalidValue` for bad content
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::io_error(path, e))?;

        let config: Self = match extension {
            "toml" => toml::from_str(&content).map_err(|e| ConfigError::parse_error(path, e))?,
            "yaml" | "yml" => {
                serde_yaml::from_str(&content).map_err(|e| ConfigError::parse_error(path, e))?
            }
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_mutations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_concurrent_mutations",
                message: "must be at least 1".to_string(),
            });
        }
        if self.propagation_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "propagation_queue_capacity",
                message: "must be at least 1".to_string(),
            });
        }
        if self.jurisdiction.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "jurisdiction",
                message: "must not be blank".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            jurisdiction: DEFAULT_JURISDICTION.to_string(),
            max_concurrent_mutations: 1,
            propagation_queue_capacity: 256,
            identity_cache_capacity: 1024,
            identity_cache_ttl_secs: 300,
        }
    }
}
