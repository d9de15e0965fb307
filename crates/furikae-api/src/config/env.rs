//! Config loading from environment variables

use std::path::PathBuf;

use furikae::FurikaeConfig;
use furikae::config::{DEFAULT_CONTAINER_NAME, DEFAULT_DOCKER_HOST, DEFAULT_QUERY_TIMEOUT_SECS};

use super::constants::{
  DEFAULT_BIND_ADDR, ENV_BIND_ADDR, ENV_CONTAINER, ENV_DOCKER_HOST, ENV_FREQUENCY_TABLE,
  ENV_QUERY_TIMEOUT_SECS,
};
use crate::errors::ApiError;

/// API Server Configuration
#[derive(Debug, Clone)]
pub struct Config {
  /// Bind address (e.g. "127.0.0.1:5530")
  pub bind_addr: String,
  /// Docker Engine API URL
  pub docker_host: String,
  /// Analyzer container name
  pub container_name: String,
  /// Analysis timeout in seconds
  pub query_timeout_secs: u64,
  /// Kanji frequency table file (embedded table when `None`)
  pub frequency_table: Option<PathBuf>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      bind_addr: DEFAULT_BIND_ADDR.to_string(),
      docker_host: DEFAULT_DOCKER_HOST.to_string(),
      container_name: DEFAULT_CONTAINER_NAME.to_string(),
      query_timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
      frequency_table: None,
    }
  }
}

impl Config {
  /// Loads configuration from environment variables
  ///
  /// # Errors
  /// Returns an error if environment variable values are invalid
  pub fn from_env() -> crate::errors::Result<Self> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Loads configuration through `lookup` (unset variables fall back to defaults)
  ///
  /// # Errors
  /// `FURIKAE_QUERY_TIMEOUT_SECS` is not a non-negative integer
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> crate::errors::Result<Self> {
    let defaults = Self::default();

    let query_timeout_secs = match lookup(ENV_QUERY_TIMEOUT_SECS) {
      Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
        ApiError::config(format!("{ENV_QUERY_TIMEOUT_SECS}={raw} is not a number of seconds: {e}"))
      })?,
      None => defaults.query_timeout_secs,
    };

    Ok(Self {
      bind_addr: lookup(ENV_BIND_ADDR).unwrap_or(defaults.bind_addr),
      docker_host: lookup(ENV_DOCKER_HOST).unwrap_or(defaults.docker_host),
      container_name: lookup(ENV_CONTAINER).unwrap_or(defaults.container_name),
      query_timeout_secs,
      frequency_table: lookup(ENV_FREQUENCY_TABLE)
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from),
    })
  }

  /// Library configuration for these settings
  #[must_use]
  pub fn to_furikae_config(&self) -> FurikaeConfig {
    let mut config = FurikaeConfig::default();
    config.container.docker_host = self.docker_host.clone();
    config.container.container_name = self.container_name.clone();
    config.timeouts.query_secs = self.query_timeout_secs;
    config.transliteration.frequency_table = self.frequency_table.clone();
    config
  }
}
