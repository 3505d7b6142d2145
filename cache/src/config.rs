//! Declarative cache configuration, loadable from YAML.
//!
//! ```yaml
//! capacity: 10000
//! protected_ratio: 0.8
//! expiration:
//!   check_interval: 500ms
//!   iterate_count: 200
//! ```

use crate::task::collector::{CollectorConfig, DEFAULT_CHECK_INTERVAL, DEFAULT_ITERATE_COUNT};

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Errors raised while loading a [`CacheConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("Configuration file not found: {0}")]
  NotFound(String),

  #[error("Failed to read configuration file: {0}")]
  Read(#[from] std::io::Error),

  #[error("Failed to parse configuration: {0}")]
  Parse(#[from] serde_yaml::Error),
}

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

fn default_protected_ratio() -> f64 {
  0.8
}

fn default_check_interval() -> Duration {
  DEFAULT_CHECK_INTERVAL
}

fn default_iterate_count() -> usize {
  DEFAULT_ITERATE_COUNT
}

fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
  D: Deserializer<'de>,
{
  let text = String::deserialize(deserializer)?;
  humantime::parse_duration(&text).map_err(serde::de::Error::custom)
}

/// The whole cache. Omitting `capacity` leaves the cache unbounded; omitting
/// `expiration` disables proactive expiration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
  #[serde(default)]
  pub capacity: Option<u64>,
  #[serde(default = "default_protected_ratio")]
  pub protected_ratio: f64,
  #[serde(default)]
  pub expiration: Option<ExpirationConfig>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      capacity: None,
      protected_ratio: default_protected_ratio(),
      expiration: None,
    }
  }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExpirationConfig {
  /// A human readable period, e.g. `250ms` or `2s`.
  #[serde(default = "default_check_interval", deserialize_with = "deserialize_duration")]
  pub check_interval: Duration,
  #[serde(default = "default_iterate_count")]
  pub iterate_count: usize,
}

impl Default for ExpirationConfig {
  fn default() -> Self {
    Self {
      check_interval: default_check_interval(),
      iterate_count: default_iterate_count(),
    }
  }
}

impl From<&ExpirationConfig> for CollectorConfig {
  fn from(config: &ExpirationConfig) -> Self {
    CollectorConfig {
      check_interval: config.check_interval,
      iterate_count: config.iterate_count,
    }
  }
}

impl CacheConfig {
  pub fn from_yaml_str(yaml: &str) -> Result<Self> {
    Ok(serde_yaml::from_str(yaml)?)
  }

  pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    if !path.exists() {
      return Err(ConfigError::NotFound(path.display().to_string()));
    }
    let text = std::fs::read_to_string(path)?;
    Self::from_yaml_str(&text)
  }
}
