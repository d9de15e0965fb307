// crates/furikae/src/config.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::errors::ConfigError;

/// Default Docker Engine API endpoint.
pub const DEFAULT_DOCKER_HOST: &str = "http://127.0.0.1:2375";

/// Default name of the analyzer container (compose project `ichiran`, service `main`).
pub const DEFAULT_CONTAINER_NAME: &str = "ichiran-main-1";

/// Default companion containers started before the analyzer (the database service).
pub const DEFAULT_COMPANION_CONTAINER: &str = "ichiran-pg-1";

/// Log line substring emitted by the analyzer once it accepts queries.
pub const DEFAULT_READY_SENTINEL: &str = "All set, awaiting commands";

/// First-time provisioning can include a full image build: 25 minutes.
pub const DEFAULT_READY_TIMEOUT_SECS: u64 = 25 * 60;

/// Steady-state query timeout: 45 minutes.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 45 * 60;

/// Default maximum frequency rank kept as kanji.
pub const DEFAULT_FREQUENCY_THRESHOLD: usize = 2000;

/// Top-level configuration for furikae.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FurikaeConfig {
  /// [container] section
  #[serde(default)]
  pub container: ContainerConfig,
  /// [timeouts] section
  #[serde(default)]
  pub timeouts: TimeoutConfig,
  /// [analysis] section
  #[serde(default)]
  pub analysis: AnalysisConfig,
  /// [transliteration] section
  #[serde(default)]
  pub transliteration: TransliterationConfig,
  /// [logging] section
  #[serde(default)]
  pub logging: LoggingConfig,
}

/// [container] section configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ContainerConfig {
  /// Docker Engine API base URL (e.g., "http://127.0.0.1:2375")
  #[serde(default = "default_docker_host")]
  pub docker_host: String,
  /// Name of the container running the analyzer
  #[serde(default = "default_container_name")]
  pub container_name: String,
  /// Containers that must be started before the analyzer, in order
  #[serde(default = "default_companions")]
  pub companion_containers: Vec<String>,
  /// Substring of the log line that marks the analyzer as ready
  #[serde(default = "default_ready_sentinel")]
  pub ready_sentinel: String,
}

fn default_docker_host() -> String {
  DEFAULT_DOCKER_HOST.to_string()
}

fn default_container_name() -> String {
  DEFAULT_CONTAINER_NAME.to_string()
}

fn default_companions() -> Vec<String> {
  vec![DEFAULT_COMPANION_CONTAINER.to_string()]
}

fn default_ready_sentinel() -> String {
  DEFAULT_READY_SENTINEL.to_string()
}

impl Default for ContainerConfig {
  fn default() -> Self {
    Self {
      docker_host: default_docker_host(),
      container_name: default_container_name(),
      companion_containers: default_companions(),
      ready_sentinel: default_ready_sentinel(),
    }
  }
}

/// [timeouts] section configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutConfig {
  /// Upper bound for bringing the analyzer to a ready state (seconds)
  #[serde(default = "default_ready_secs")]
  pub ready_secs: u64,
  /// Upper bound for a single analysis request (seconds)
  #[serde(default = "default_query_secs")]
  pub query_secs: u64,
}

fn default_ready_secs() -> u64 {
  DEFAULT_READY_TIMEOUT_SECS
}

fn default_query_secs() -> u64 {
  DEFAULT_QUERY_TIMEOUT_SECS
}

impl Default for TimeoutConfig {
  fn default() -> Self {
    Self {
      ready_secs: default_ready_secs(),
      query_secs: default_query_secs(),
    }
  }
}

/// [analysis] section configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
  /// Whether to run the second, kanji-level reading query per token
  #[serde(default = "default_true")]
  pub fetch_kanji_readings: bool,
}

fn default_true() -> bool {
  true
}

impl Default for AnalysisConfig {
  fn default() -> Self {
    Self {
      fetch_kanji_readings: true,
    }
  }
}

/// [transliteration] section configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TransliterationConfig {
  /// Kanji frequency table file (most frequent first).
  ///
  /// If omitted, the user override in the config directory is tried, then the embedded table.
  #[serde(default)]
  pub frequency_table: Option<PathBuf>,
  /// Threshold used when the caller does not pass one
  #[serde(default = "default_threshold")]
  pub default_threshold: usize,
}

fn default_threshold() -> usize {
  DEFAULT_FREQUENCY_THRESHOLD
}

impl Default for TransliterationConfig {
  fn default() -> Self {
    Self {
      frequency_table: None,
      default_threshold: default_threshold(),
    }
  }
}

/// [logging] section configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
  /// Log level: "trace" | "debug" | "info" | "warn" | "error"
  #[serde(default)]
  pub level: LogLevel,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
  /// trace
  Trace,

  /// debug
  Debug,

  /// info
  #[default]
  Info,

  /// warn
  Warn,

  ///error
  Error,
}

impl LogLevel {
  /// Returns the directive string understood by `tracing_subscriber::EnvFilter`.
  pub fn as_directive(&self) -> &'static str {
    match self {
      LogLevel::Trace => "trace",
      LogLevel::Debug => "debug",
      LogLevel::Info => "info",
      LogLevel::Warn => "warn",
      LogLevel::Error => "error",
    }
  }
}

// ===== Accessor Methods =====

impl FurikaeConfig {
  /// Returns the Docker Engine API base URL without a trailing slash.
  pub fn docker_host(&self) -> &str {
    self.container.docker_host.trim_end_matches('/')
  }

  /// Returns the analyzer container name.
  pub fn container_name(&self) -> &str {
    &self.container.container_name
  }

  /// Returns the companion containers in start order.
  pub fn companion_containers(&self) -> &[String] {
    &self.container.companion_containers
  }

  /// Returns the readiness sentinel substring.
  pub fn ready_sentinel(&self) -> &str {
    &self.container.ready_sentinel
  }

  /// Returns the readiness timeout.
  pub fn ready_timeout(&self) -> Duration {
    Duration::from_secs(self.timeouts.ready_secs)
  }

  /// Returns the per-request timeout.
  pub fn query_timeout(&self) -> Duration {
    Duration::from_secs(self.timeouts.query_secs)
  }

  /// Returns whether the kanji reading query is enabled.
  pub fn fetch_kanji_readings(&self) -> bool {
    self.analysis.fetch_kanji_readings
  }

  /// Returns the default transliteration threshold.
  pub fn default_threshold(&self) -> usize {
    self.transliteration.default_threshold
  }

  /// Returns the configured frequency table path.
  ///
  /// `None` if unspecified. The fallback order is resolved by [`crate::transliteration::KanjiFrequency::resolve`].
  pub fn frequency_table_path(&self) -> Option<&Path> {
    self.transliteration.frequency_table.as_deref()
  }

  /// Returns the log level.
  pub fn log_level(&self) -> LogLevel {
    self.logging.level
  }

  /// Validates the configuration.
  ///
  /// # Validation Items
  /// - `container.container_name` is not empty
  /// - `container.docker_host` starts with `http://` or `https://`
  /// - `container.ready_sentinel` is not empty
  /// - `timeouts.ready_secs` >= 1, `timeouts.query_secs` >= 1
  /// - `transliteration.default_threshold` >= 1
  /// - `transliteration.frequency_table` is an existing file if set
  ///
  /// # Errors
  /// Returns the first failing `ConfigError`.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.container.container_name.trim().is_empty() {
      return Err(ConfigError::EmptyContainerName);
    }

    let host = &self.container.docker_host;
    if !(host.starts_with("http://") || host.starts_with("https://")) {
      return Err(ConfigError::InvalidDockerHost { host: host.clone() });
    }

    if self.container.ready_sentinel.is_empty() {
      return Err(ConfigError::EmptyReadySentinel);
    }

    if self.timeouts.ready_secs < 1 {
      return Err(ConfigError::InvalidTimeout {
        field: "timeouts.ready_secs",
        actual: self.timeouts.ready_secs,
      });
    }

    if self.timeouts.query_secs < 1 {
      return Err(ConfigError::InvalidTimeout {
        field: "timeouts.query_secs",
        actual: self.timeouts.query_secs,
      });
    }

    if self.transliteration.default_threshold < 1 {
      return Err(ConfigError::InvalidThreshold {
        actual: self.transliteration.default_threshold,
      });
    }

    if let Some(path) = &self.transliteration.frequency_table {
      if !path.is_file() {
        return Err(ConfigError::FrequencyTableNotFound { path: path.clone() });
      }
    }

    Ok(())
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Test Module
// ─────────────────────────────────────────────────────────────────────────────
