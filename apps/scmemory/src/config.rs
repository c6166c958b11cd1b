//! # Client Configuration
//!
//! Settings are layered, later layers winning:
//!
//! 1. built-in defaults
//! 2. optional TOML file (`--config`)
//! 3. environment (`SCMEMORY_URL`, `SCMEMORY_WORKERS`)
//! 4. command-line flags
//!
//! ```toml
//! url = "ws://localhost:8090/ws_json"
//! workers = 4
//! ```

use crate::error::AppError;
use scmemory_core::primitives::DEFAULT_WORKERS;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine endpoint used when nothing else is configured.
pub const DEFAULT_URL: &str = "ws://localhost:8090/ws_json";

/// Environment variable overriding the engine URL.
pub const ENV_URL: &str = "SCMEMORY_URL";

/// Environment variable overriding the worker count.
pub const ENV_WORKERS: &str = "SCMEMORY_WORKERS";

/// Resolved client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// WebSocket URL of the engine.
    pub url: String,
    /// Worker threads for the call pool.
    pub workers: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            workers: DEFAULT_WORKERS,
        }
    }
}

impl ClientConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, AppError> {
        toml::from_str(text).map_err(|e| AppError::ConfigParse(e.to_string()))
    }

    /// Defaults, or the contents of `path` when given.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|e| AppError::ConfigIo {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Apply environment overrides read through `lookup`.
    pub fn with_env(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        if let Some(url) = lookup(ENV_URL) {
            self.url = url;
        }
        if let Some(raw) = lookup(ENV_WORKERS) {
            self.workers = raw.trim().parse().map_err(|e| AppError::InvalidValue {
                key: ENV_WORKERS,
                message: format!("'{raw}': {e}"),
            })?;
        }
        Ok(self)
    }

    /// Apply command-line overrides.
    #[must_use]
    pub fn with_flags(mut self, url: Option<String>, workers: Option<usize>) -> Self {
        if let Some(url) = url {
            self.url = url;
        }
        if let Some(workers) = workers {
            self.workers = workers;
        }
        self
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(AppError::InvalidValue {
                key: "url",
                message: format!("'{}' is not a ws:// or wss:// URL", self.url),
            });
        }
        if self.workers == 0 {
            return Err(AppError::InvalidValue {
                key: "workers",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Resolve every layer against the process environment.
    pub fn resolve(
        path: Option<&Path>,
        url: Option<String>,
        workers: Option<usize>,
    ) -> Result<Self, AppError> {
        let config = Self::load(path)?
            .with_env(|key| std::env::var(key).ok())?
            .with_flags(url, workers);
        config.validate()?;
        tracing::debug!(url = %config.url, workers = config.workers, "configuration resolved");
        Ok(config)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.url, DEFAULT_URL);
        assert_eq!(config.workers, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ClientConfig::from_toml_str("workers = 8\n").expect("parse");
        assert_eq!(config.workers, 8);
        assert_eq!(config.url, DEFAULT_URL);
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(matches!(
            ClientConfig::from_toml_str("port = 1\n"),
            Err(AppError::ConfigParse(_))
        ));
    }

    #[test]
    fn layers_apply_in_order() {
        let env = |key: &str| match key {
            ENV_URL => Some("ws://env:1/ws_json".to_string()),
            ENV_WORKERS => Some("2".to_string()),
            _ => None,
        };
        let config = ClientConfig::from_toml_str("url = \"ws://file:1\"\nworkers = 6\n")
            .expect("parse")
            .with_env(env)
            .expect("env")
            .with_flags(None, Some(3));
        assert_eq!(config.url, "ws://env:1/ws_json");
        assert_eq!(config.workers, 3);
    }

    #[test]
    fn bad_worker_env_is_reported() {
        let err = ClientConfig::default()
            .with_env(|key| (key == ENV_WORKERS).then(|| "many".to_string()))
            .expect_err("bad value");
        assert!(matches!(
            err,
            AppError::InvalidValue {
                key: ENV_WORKERS,
                ..
            }
        ));
    }

    #[test]
    fn validation_rejects_http_and_zero_workers() {
        let http = ClientConfig::default().with_flags(Some("http://x".into()), None);
        assert!(http.validate().is_err());
        let idle = ClientConfig::default().with_flags(None, Some(0));
        assert!(idle.validate().is_err());
    }
}
