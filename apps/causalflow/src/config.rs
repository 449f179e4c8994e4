//! # Configuration
//!
//! Resolution order (highest priority first):
//! 1. CLI flags (`--url`)
//! 2. Environment variables (`CAUSALFLOW_*`)
//! 3. TOML file given with `--config`
//! 4. Compiled defaults

use causalflow_core::primitives::NOTIFICATION_TTL_MS;
use causalflow_core::{Estimator, Scoring};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const ENV_URL: &str = "CAUSALFLOW_URL";
pub const ENV_NOTIFY_TTL_MS: &str = "CAUSALFLOW_NOTIFY_TTL_MS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {message}")]
    Read { path: String, message: String },
    #[error("Invalid config file {path}: {message}")]
    Parse { path: String, message: String },
    #[error("Invalid value for {field}: {message}")]
    Invalid { field: String, message: String },
}

/// Client configuration. Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model service root, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Prefix of every operation except the health check.
    pub api_prefix: String,
    /// How long a notification stays visible.
    pub notification_ttl_ms: u64,
    /// Also register manual nodes with the service.
    pub register_manual_nodes: bool,
    pub scoring: Scoring,
    pub estimator: Estimator,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_prefix: "/api".to_string(),
            notification_ttl_ms: NOTIFICATION_TTL_MS,
            register_manual_nodes: false,
            scoring: Scoring::default(),
            estimator: Estimator::default(),
        }
    }
}

impl Config {
    /// Load from an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_from(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load from a TOML string (for tests).
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::Parse {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    /// Apply `CAUSALFLOW_*` overrides read through `lookup`.
    pub fn apply_env_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = lookup(ENV_URL).filter(|u| !u.trim().is_empty()) {
            self.base_url = url;
        }
        if let Some(ttl) = lookup(ENV_NOTIFY_TTL_MS) {
            self.notification_ttl_ms = ttl.trim().parse().map_err(|_| ConfigError::Invalid {
                field: ENV_NOTIFY_TTL_MS.to_string(),
                message: format!("expected milliseconds, got {ttl:?}"),
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                field: "base_url".to_string(),
                message: format!("must be an http(s) URL, got {:?}", self.base_url),
            });
        }
        if self.notification_ttl_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "notification_ttl_ms".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn notification_ttl(&self) -> Duration {
        Duration::from_millis(self.notification_ttl_ms)
    }
}

// =============================================================================
// TESTS
// =============================================================================
