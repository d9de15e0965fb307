//! Container runtime abstraction
//!
//! The analyzer runs inside a long-lived container. This module defines the narrow
//! interface the rest of the crate needs from whoever provisions that container:
//! a state query, a start operation, a log subscription, and one-shot command execution.

pub mod docker;
pub mod scripted;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;

use crate::command::demux::StreamKind;
use crate::errors::RuntimeError;

pub use docker::DockerRuntime;
pub use scripted::{ScriptedExec, ScriptedRuntime};

/// Observed state of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
  /// Created but never started
  Created,
  /// Running
  Running,
  /// Paused
  Paused,
  /// Restarting
  Restarting,
  /// Exited
  Exited,
  /// Dead
  Dead,
  /// Any status string not listed above
  Unknown,
}

impl ContainerState {
  /// Parses a Docker `State.Status` string.
  pub fn from_status(status: &str) -> Self {
    match status.trim().to_ascii_lowercase().as_str() {
      "created" => ContainerState::Created,
      "running" => ContainerState::Running,
      "paused" => ContainerState::Paused,
      "restarting" => ContainerState::Restarting,
      "exited" => ContainerState::Exited,
      "dead" => ContainerState::Dead,
      _ => ContainerState::Unknown,
    }
  }

  /// Returns the lowercase status string.
  pub fn as_str(&self) -> &'static str {
    match self {
      ContainerState::Created => "created",
      ContainerState::Running => "running",
      ContainerState::Paused => "paused",
      ContainerState::Restarting => "restarting",
      ContainerState::Exited => "exited",
      ContainerState::Dead => "dead",
      ContainerState::Unknown => "unknown",
    }
  }

  /// Only `Running` accepts commands.
  pub fn is_running(&self) -> bool {
    matches!(self, ContainerState::Running)
  }
}

impl fmt::Display for ContainerState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Result of a container inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
  /// Current state
  pub state: ContainerState,
  /// User configured for the container (`Config.User`), if any
  pub user: Option<String>,
}

/// One line of container log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
  /// Stream the line was written to
  pub stream: StreamKind,
  /// Line text without the trailing newline
  pub text: String,
}

/// Receiving end of a log subscription.
///
/// The feeding task stops once this receiver is dropped.
pub type LogSubscription = mpsc::Receiver<LogLine>;

/// Identifier of a single exec unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExecId(pub String);

impl ExecId {
  /// Returns the raw identifier.
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for ExecId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Framed, multiplexed output of an exec unit.
pub type ExecOutputStream = Box<dyn AsyncRead + Send + Unpin>;

/// A running, named, inspectable analyzer container.
///
/// Implementations are shared between concurrent requests; every method takes `&self`.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
  /// Name of the analyzer container.
  fn name(&self) -> &str;

  /// Queries the current state.
  async fn inspect(&self) -> Result<ContainerInfo, RuntimeError>;

  /// Starts the managed container group (companions first, then the analyzer).
  async fn start(&self) -> Result<(), RuntimeError>;

  /// Subscribes to the combined stdout/stderr log of the analyzer container.
  async fn logs(&self) -> Result<LogSubscription, RuntimeError>;

  /// Creates a new exec unit running `argv` as `user`.
  async fn create_exec(&self, user: Option<&str>, argv: &[String]) -> Result<ExecId, RuntimeError>;

  /// Starts an exec unit and attaches to its framed output.
  async fn start_exec(&self, exec: &ExecId) -> Result<ExecOutputStream, RuntimeError>;

  /// Exit code of a finished exec unit. `None` while it is still reported running.
  async fn exec_exit_code(&self, exec: &ExecId) -> Result<Option<i64>, RuntimeError>;

  /// Stops the analyzer container.
  async fn stop(&self) -> Result<(), RuntimeError>;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_docker_status_strings() {
    assert_eq!(ContainerState::from_status("running"), ContainerState::Running);
    assert_eq!(ContainerState::from_status("Exited"), ContainerState::Exited);
    assert_eq!(ContainerState::from_status(" created "), ContainerState::Created);
    assert_eq!(ContainerState::from_status("removing"), ContainerState::Unknown);
    assert_eq!(ContainerState::from_status(""), ContainerState::Unknown);
  }

  #[test]
  fn only_running_is_running() {
    assert!(ContainerState::Running.is_running());
    assert!(!ContainerState::Restarting.is_running());
    assert!(!ContainerState::Unknown.is_running());
  }

  #[test]
  fn display_matches_status_string() {
    assert_eq!(ContainerState::Paused.to_string(), "paused");
    assert_eq!(ExecId("abc".to_string()).to_string(), "abc");
  }

  #[test]
  fn serializes_lowercase() {
    let json = serde_json::to_string(&ContainerState::Running).unwrap();
    assert_eq!(json, "\"running\"");
  }
}
