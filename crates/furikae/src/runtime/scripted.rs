//! In-memory container runtime
//!
//! Replays canned log lines and exec output so the readiness controller and the
//! analysis pipeline can be exercised without a Docker daemon.
//!
//! # Example
//!
//! ```ignore
//! use furikae::runtime::{ScriptedExec, ScriptedRuntime};
//!
//! let runtime = ScriptedRuntime::new("ichiran-main-1")
//!   .with_log_line("All set, awaiting commands")
//!   .with_exec("ichiran-cli -f", ScriptedExec::stdout(r#"[["watashi", {"text": "私"}, []]]"#));
//! ```

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{
  ContainerInfo, ContainerRuntime, ContainerState, ExecId, ExecOutputStream, LogLine,
  LogSubscription,
};
use crate::command::demux::{StreamKind, encode_frame};
use crate::errors::RuntimeError;

/// Canned result of one exec unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedExec {
  /// Frames written by the command, in order
  pub frames: Vec<(StreamKind, Vec<u8>)>,
  /// Reported exit code (`None` = still running)
  pub exit_code: Option<i64>,
}

impl ScriptedExec {
  /// A successful command printing `text` on stdout.
  pub fn stdout(text: impl Into<String>) -> Self {
    Self {
      frames: vec![(StreamKind::Stdout, text.into().into_bytes())],
      exit_code: Some(0),
    }
  }

  /// Adds a stderr frame before the existing frames.
  pub fn with_stderr_prefix(mut self, text: impl Into<String>) -> Self {
    self.frames.insert(0, (StreamKind::Stderr, text.into().into_bytes()));
    self
  }

  /// Overrides the exit code.
  pub fn with_exit_code(mut self, exit_code: Option<i64>) -> Self {
    self.exit_code = exit_code;
    self
  }

  fn encode(&self) -> Vec<u8> {
    self
      .frames
      .iter()
      .flat_map(|(stream, payload)| encode_frame(*stream, payload))
      .collect()
  }
}

/// Scripted [`ContainerRuntime`].
///
/// Exec requests are routed by the first rule whose pattern appears in the joined argv.
#[derive(Debug)]
pub struct ScriptedRuntime {
  name: String,
  user: Option<String>,
  state: Mutex<ContainerState>,
  running_on_start: bool,
  start_failure: Option<String>,
  logs_failure: Option<String>,
  log_lines: Vec<LogLine>,
  log_interval: Duration,
  keep_logs_open: bool,
  exec_rules: Vec<(String, ScriptedExec)>,
  exec_delay: Duration,
  start_delay: Duration,
  executed: Mutex<Vec<Vec<String>>>,
  exit_codes: Mutex<HashMap<String, Option<i64>>>,
  exec_counter: AtomicUsize,
  start_calls: AtomicUsize,
  stop_calls: AtomicUsize,
}

impl ScriptedRuntime {
  /// A runtime that is already running and has no scripted output.
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      user: None,
      state: Mutex::new(ContainerState::Running),
      running_on_start: true,
      start_failure: None,
      logs_failure: None,
      log_lines: Vec::new(),
      log_interval: Duration::ZERO,
      keep_logs_open: true,
      exec_rules: Vec::new(),
      exec_delay: Duration::ZERO,
      start_delay: Duration::ZERO,
      executed: Mutex::new(Vec::new()),
      exit_codes: Mutex::new(HashMap::new()),
      exec_counter: AtomicUsize::new(0),
      start_calls: AtomicUsize::new(0),
      stop_calls: AtomicUsize::new(0),
    }
  }

  /// Initial state reported by `inspect`.
  pub fn with_state(self, state: ContainerState) -> Self {
    self.set_state(state);
    self
  }

  /// Whether `start` switches the state to `Running` (default `true`).
  pub fn with_running_on_start(mut self, running: bool) -> Self {
    self.running_on_start = running;
    self
  }

  /// Container user reported by `inspect`.
  pub fn with_user(mut self, user: impl Into<String>) -> Self {
    self.user = Some(user.into());
    self
  }

  /// Makes `start` fail with `reason`.
  pub fn with_start_failure(mut self, reason: impl Into<String>) -> Self {
    self.start_failure = Some(reason.into());
    self
  }

  /// Makes `logs` fail with `reason`.
  pub fn with_logs_failure(mut self, reason: impl Into<String>) -> Self {
    self.logs_failure = Some(reason.into());
    self
  }

  /// Appends a stdout log line.
  pub fn with_log_line(self, text: impl Into<String>) -> Self {
    self.with_log(StreamKind::Stdout, text)
  }

  /// Appends a log line on `stream`.
  pub fn with_log(mut self, stream: StreamKind, text: impl Into<String>) -> Self {
    self.log_lines.push(LogLine {
      stream,
      text: text.into(),
    });
    self
  }

  /// Delay before each log line.
  pub fn with_log_interval(mut self, interval: Duration) -> Self {
    self.log_interval = interval;
    self
  }

  /// Whether the log subscription stays open after the last line (default `true`).
  pub fn with_logs_kept_open(mut self, keep_open: bool) -> Self {
    self.keep_logs_open = keep_open;
    self
  }

  /// Routes exec requests whose argv contains `pattern` to `exec`.
  pub fn with_exec(mut self, pattern: impl Into<String>, exec: ScriptedExec) -> Self {
    self.exec_rules.push((pattern.into(), exec));
    self
  }

  /// Delay applied when an exec unit is started.
  pub fn with_exec_delay(mut self, delay: Duration) -> Self {
    self.exec_delay = delay;
    self
  }

  /// Time `start` takes before the container reports running.
  pub fn with_start_delay(mut self, delay: Duration) -> Self {
    self.start_delay = delay;
    self
  }

  /// Replaces the reported state.
  pub fn set_state(&self, state: ContainerState) {
    *lock(&self.state) = state;
  }

  /// Every argv passed to `create_exec`, in order.
  pub fn executed(&self) -> Vec<Vec<String>> {
    lock(&self.executed).clone()
  }

  /// Number of `start` calls.
  pub fn start_calls(&self) -> usize {
    self.start_calls.load(Ordering::SeqCst)
  }

  /// Number of `stop` calls.
  pub fn stop_calls(&self) -> usize {
    self.stop_calls.load(Ordering::SeqCst)
  }

  fn route(&self, argv: &[String]) -> Option<&ScriptedExec> {
    let joined = argv.join(" ");
    self
      .exec_rules
      .iter()
      .find(|(pattern, _)| joined.contains(pattern.as_str()))
      .map(|(_, exec)| exec)
  }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ContainerRuntime for ScriptedRuntime {
  fn name(&self) -> &str {
    &self.name
  }

  async fn inspect(&self) -> Result<ContainerInfo, RuntimeError> {
    Ok(ContainerInfo {
      state: *lock(&self.state),
      user: self.user.clone(),
    })
  }

  async fn start(&self) -> Result<(), RuntimeError> {
    self.start_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(reason) = &self.start_failure {
      return Err(RuntimeError::Unavailable {
        reason: reason.clone(),
      });
    }
    if !self.start_delay.is_zero() {
      tokio::time::sleep(self.start_delay).await;
    }
    if self.running_on_start {
      self.set_state(ContainerState::Running);
    }
    Ok(())
  }

  async fn logs(&self) -> Result<LogSubscription, RuntimeError> {
    if let Some(reason) = &self.logs_failure {
      return Err(RuntimeError::Unavailable {
        reason: reason.clone(),
      });
    }

    let (tx, rx) = mpsc::channel(self.log_lines.len().max(1));
    let lines = self.log_lines.clone();
    let interval = self.log_interval;
    let keep_open = self.keep_logs_open;
    tokio::spawn(async move {
      for line in lines {
        if !interval.is_zero() {
          tokio::time::sleep(interval).await;
        }
        if tx.send(line).await.is_err() {
          return;
        }
      }
      if keep_open {
        tx.closed().await;
      }
    });
    Ok(rx)
  }

  async fn create_exec(&self, _user: Option<&str>, argv: &[String]) -> Result<ExecId, RuntimeError> {
    lock(&self.executed).push(argv.to_vec());
    let n = self.exec_counter.fetch_add(1, Ordering::SeqCst);
    Ok(ExecId(format!("exec-{n}")))
  }

  async fn start_exec(&self, exec: &ExecId) -> Result<ExecOutputStream, RuntimeError> {
    let argv = lock(&self.executed)
      .get(exec_index(exec))
      .cloned()
      .unwrap_or_default();
    let scripted = self.route(&argv).cloned().ok_or_else(|| RuntimeError::Unavailable {
      reason: format!("no scripted output for `{}`", argv.join(" ")),
    })?;

    if !self.exec_delay.is_zero() {
      tokio::time::sleep(self.exec_delay).await;
    }

    lock(&self.exit_codes).insert(exec.as_str().to_string(), scripted.exit_code);
    Ok(Box::new(std::io::Cursor::new(scripted.encode())))
  }

  async fn exec_exit_code(&self, exec: &ExecId) -> Result<Option<i64>, RuntimeError> {
    lock(&self.exit_codes)
      .get(exec.as_str())
      .copied()
      .ok_or_else(|| RuntimeError::InvalidResponse {
        operation: "exec_inspect",
        reason: format!("unknown exec {exec}"),
      })
  }

  async fn stop(&self) -> Result<(), RuntimeError> {
    self.stop_calls.fetch_add(1, Ordering::SeqCst);
    self.set_state(ContainerState::Exited);
    Ok(())
  }
}

fn exec_index(exec: &ExecId) -> usize {
  exec
    .as_str()
    .strip_prefix("exec-")
    .and_then(|n| n.parse().ok())
    .unwrap_or(usize::MAX)
}
