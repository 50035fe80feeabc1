//! Backend configuration
//!
//! Loaded from TOML and then overridden by `TWINSTORE_*` environment
//! variables:
//!
//! ```toml
//! default_mode = "dual"
//! log = "development"
//!
//! [primary]
//! path = "data/primary.db"
//! busy_timeout_ms = 5000
//!
//! [secondary]
//! path = "data/secondary.db"
//!
//! [secondary.retry]
//! max_retries = 5
//! initial_backoff_ms = 10
//! max_backoff_ms = 200
//! ```

#![allow(clippy::result_large_err)]

use crate::errors::{io_error, ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use twinstore_core::Mode;

pub const ENV_PRIMARY_PATH: &str = "TWINSTORE_PRIMARY_PATH";
pub const ENV_SECONDARY_PATH: &str = "TWINSTORE_SECONDARY_PATH";
pub const ENV_DEFAULT_MODE: &str = "TWINSTORE_DEFAULT_MODE";
pub const ENV_LOG: &str = "TWINSTORE_LOG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub primary: PrimaryConfig,
    #[serde(default)]
    pub secondary: Option<SecondaryConfig>,
    /// Mode used when a request carries none
    #[serde(default)]
    pub default_mode: Option<Mode>,
    /// Logging profile name
    #[serde(default)]
    pub log: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryConfig {
    pub path: PathBuf,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub retry: RetryPolicy,
}

/// Exponential backoff for the secondary transaction runner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Re-runs allowed after the first attempt
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff_ms: 10,
            max_backoff_ms: 200,
        }
    }
}

impl RetryPolicy {
    /// Delay before re-running after failed attempt number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::InvalidRetry {
                reason: format!(
                    "initial_backoff_ms ({}) exceeds max_backoff_ms ({})",
                    self.initial_backoff_ms, self.max_backoff_ms
                ),
            });
        }
        Ok(())
    }
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl BackendConfig {
    /// Primary only, everything else defaulted
    pub fn new(primary_path: impl Into<PathBuf>) -> Self {
        Self {
            primary: PrimaryConfig {
                path: primary_path.into(),
                busy_timeout_ms: default_busy_timeout_ms(),
            },
            secondary: None,
            default_mode: None,
            log: None,
        }
    }

    pub fn with_secondary(mut self, path: impl Into<PathBuf>) -> Self {
        self.secondary = Some(SecondaryConfig {
            path: path.into(),
            retry: RetryPolicy::default(),
        });
        self
    }

    pub fn with_default_mode(mut self, mode: Mode) -> Self {
        self.default_mode = Some(mode);
        self
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.primary.busy_timeout_ms)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| io_error("load_config", e))?;
        Self::from_toml_str(&text)
    }

    /// Apply `TWINSTORE_*` overrides from the process environment
    pub fn apply_env(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup; empty values are ignored
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = get(ENV_PRIMARY_PATH) {
            self.primary.path = PathBuf::from(path);
        }
        if let Some(path) = get(ENV_SECONDARY_PATH) {
            let retry = self
                .secondary
                .take()
                .map(|s| s.retry)
                .unwrap_or_default();
            self.secondary = Some(SecondaryConfig {
                path: PathBuf::from(path),
                retry,
            });
        }
        if let Some(mode) = get(ENV_DEFAULT_MODE) {
            let mode = mode
                .parse::<Mode>()
                .map_err(|e| ConfigError::InvalidOverride {
                    key: ENV_DEFAULT_MODE.to_string(),
                    reason: e.to_string(),
                })?;
            self.default_mode = Some(mode);
        }
        if let Some(log) = get(ENV_LOG) {
            self.log = Some(log);
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        match &self.secondary {
            Some(secondary) => secondary.retry.validate(),
            None => Ok(()),
        }
    }
}
