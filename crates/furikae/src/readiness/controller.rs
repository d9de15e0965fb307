//! Bring-up of the analyzer container
//!
//! `start` is issued while a background task follows the container log. The first line
//! containing the sentinel resolves the ready signal. The wait ends on whichever comes
//! first: ready, a start or listener failure, or the deadline. After the sentinel, the
//! container must still report `running`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::signal::{ListenerGuard, ReadySignal};
use crate::command::StreamKind;
use crate::errors::RuntimeError;
use crate::runtime::{ContainerRuntime, LogLine, LogSubscription};

/// Pause before following the log again after the stream ended.
const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(1);

/// Observable state of one bring-up attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadinessState {
  /// `bring_up` not called yet
  NotStarted,
  /// Waiting for the sentinel
  Starting,
  /// Sentinel seen and container running
  Ready,
  /// Start, log or liveness failure
  Failed,
  /// Deadline reached first
  TimedOut,
}

impl fmt::Display for ReadinessState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      ReadinessState::NotStarted => "not_started",
      ReadinessState::Starting => "starting",
      ReadinessState::Ready => "ready",
      ReadinessState::Failed => "failed",
      ReadinessState::TimedOut => "timed_out",
    };
    f.write_str(s)
  }
}

/// Terminal outcome of [`ReadinessController::bring_up`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BringUp {
  /// The analyzer accepts commands
  Ready,
  /// The container cannot be used
  Failed(String),
  /// No sentinel before the deadline
  TimedOut,
}

impl BringUp {
  /// Matching terminal state.
  pub fn state(&self) -> ReadinessState {
    match self {
      BringUp::Ready => ReadinessState::Ready,
      BringUp::Failed(_) => ReadinessState::Failed,
      BringUp::TimedOut => ReadinessState::TimedOut,
    }
  }
}

/// One bring-up attempt. Retrying means building a new controller.
pub struct ReadinessController {
  runtime: Arc<dyn ContainerRuntime>,
  sentinel: String,
  state: ReadinessState,
}

impl fmt::Debug for ReadinessController {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ReadinessController")
      .field("runtime", &self.runtime.name())
      .field("sentinel", &self.sentinel)
      .field("state", &self.state)
      .finish()
  }
}

impl ReadinessController {
  /// New attempt against `runtime`, waiting for a log line containing `sentinel`.
  pub fn new(runtime: Arc<dyn ContainerRuntime>, sentinel: impl Into<String>) -> Self {
    Self {
      runtime,
      sentinel: sentinel.into(),
      state: ReadinessState::NotStarted,
    }
  }

  /// Current state. Always `NotStarted` before `bring_up`.
  pub fn state(&self) -> ReadinessState {
    self.state
  }

  /// Starts the container and waits for readiness, at most `timeout`.
  pub async fn bring_up(mut self, timeout: Duration) -> BringUp {
    self.state = ReadinessState::Starting;
    info!(
      service = %self.runtime.name(),
      timeout_secs = timeout.as_secs(),
      state = %self.state,
      "bringing up analyzer"
    );

    let outcome = self.wait(Instant::now() + timeout).await;
    self.state = outcome.state();

    match &outcome {
      BringUp::Ready => info!(service = %self.runtime.name(), state = %self.state, "analyzer ready"),
      BringUp::Failed(reason) => {
        warn!(service = %self.runtime.name(), state = %self.state, reason = %reason, "bring-up failed")
      }
      BringUp::TimedOut => {
        warn!(service = %self.runtime.name(), state = %self.state, "bring-up timed out")
      }
    }
    outcome
  }

  async fn wait(&self, deadline: Instant) -> BringUp {
    // Subscribe before starting so the sentinel cannot be missed.
    let subscription = match self.runtime.logs().await {
      Ok(subscription) => subscription,
      Err(e) => return BringUp::Failed(format!("log subscription failed: {e}")),
    };

    let (signal, mut ready) = ReadySignal::new();
    let mut listener = ListenerGuard(tokio::spawn(listen(
      Arc::clone(&self.runtime),
      subscription,
      self.sentinel.clone(),
      signal,
    )));

    let start = self.runtime.start();
    tokio::pin!(start);
    let expiry = tokio::time::sleep_until(deadline);
    tokio::pin!(expiry);
    let mut start_done = false;
    let mut ready_seen = false;

    // Old log output can carry the sentinel, so ready only counts once start has returned.
    while !(start_done && ready_seen) {
      tokio::select! {
        biased;

        received = &mut ready, if !ready_seen => match received {
          Ok(()) => ready_seen = true,
          Err(_) => return BringUp::Failed("ready signal dropped".to_string()),
        },
        joined = &mut listener.0 => {
          return BringUp::Failed(match joined {
            Ok(e) => format!("log listener stopped: {e}"),
            Err(e) => format!("log listener aborted: {e}"),
          });
        }
        started = &mut start, if !start_done => {
          start_done = true;
          if let Err(e) = started {
            return BringUp::Failed(format!("start failed: {e}"));
          }
          debug!(service = %self.runtime.name(), "start issued, waiting for sentinel");
        }
        () = &mut expiry => return BringUp::TimedOut,
      }
    }

    drop(listener);
    match tokio::time::timeout_at(deadline, self.runtime.inspect()).await {
      Err(_) => BringUp::TimedOut,
      Ok(Err(e)) => BringUp::Failed(format!("liveness check failed: {e}")),
      Ok(Ok(info)) if info.state.is_running() => BringUp::Ready,
      Ok(Ok(info)) => BringUp::Failed(format!(
        "sentinel observed but container is {}",
        info.state
      )),
    }
  }
}

/// Follows the log until aborted. Returns only when resubscribing fails.
async fn listen(
  runtime: Arc<dyn ContainerRuntime>,
  mut subscription: LogSubscription,
  sentinel: String,
  signal: ReadySignal,
) -> RuntimeError {
  let service = runtime.name().to_string();
  loop {
    while let Some(line) = subscription.recv().await {
      emit(&service, &line);
      if line.text.contains(&sentinel) && signal.fire() {
        debug!(service = %service, "ready sentinel observed");
      }
    }

    // A stopped container closes the follow stream right away.
    tokio::time::sleep(RESUBSCRIBE_DELAY).await;
    debug!(service = %service, "log stream ended, following again");
    subscription = match runtime.logs().await {
      Ok(subscription) => subscription,
      Err(e) => return e,
    };
  }
}

fn emit(service: &str, line: &LogLine) {
  match line.stream {
    StreamKind::Stderr => warn!(
      service = %service,
      stream = line.stream.as_str(),
      component = "ichiran",
      "{}",
      line.text
    ),
    _ => debug!(
      service = %service,
      stream = line.stream.as_str(),
      component = "ichiran",
      "{}",
      line.text
    ),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::runtime::{ContainerState, ScriptedRuntime};

  const SENTINEL: &str = "All set, awaiting commands";

  fn controller(runtime: ScriptedRuntime) -> (ReadinessController, Arc<ScriptedRuntime>) {
    let runtime = Arc::new(runtime);
    let dyn_runtime: Arc<dyn ContainerRuntime> = runtime.clone();
    (ReadinessController::new(dyn_runtime, SENTINEL), runtime)
  }

  // ─── Outcomes ───

  #[tokio::test]
  async fn sentinel_then_running_is_ready() {
    let (controller, runtime) = controller(
      ScriptedRuntime::new("ichiran-main-1")
        .with_state(ContainerState::Exited)
        .with_log_line("Loading dictionaries")
        .with_log(StreamKind::Stderr, "WARNING: slow start")
        .with_log_line(SENTINEL)
        .with_log_interval(Duration::from_millis(5)),
    );
    assert_eq!(controller.state(), ReadinessState::NotStarted);

    let outcome = controller.bring_up(Duration::from_secs(5)).await;
    assert_eq!(outcome, BringUp::Ready);
    assert_eq!(outcome.state(), ReadinessState::Ready);
    assert_eq!(runtime.start_calls(), 1);
  }

  #[tokio::test]
  async fn repeated_sentinel_is_harmless() {
    let (controller, _) = controller(
      ScriptedRuntime::new("ichiran-main-1")
        .with_log_line(SENTINEL)
        .with_log_line(SENTINEL),
    );
    assert_eq!(controller.bring_up(Duration::from_secs(5)).await, BringUp::Ready);
  }

  #[tokio::test]
  async fn sentinel_is_matched_as_substring() {
    let (controller, _) = controller(
      ScriptedRuntime::new("ichiran-main-1").with_log_line(format!("main-1 | {SENTINEL}!")),
    );
    assert_eq!(controller.bring_up(Duration::from_secs(5)).await, BringUp::Ready);
  }

  #[tokio::test]
  async fn sentinel_without_running_state_fails() {
    let (controller, _) = controller(
      ScriptedRuntime::new("ichiran-main-1")
        .with_state(ContainerState::Restarting)
        .with_running_on_start(false)
        .with_log_line(SENTINEL),
    );
    match controller.bring_up(Duration::from_secs(5)).await {
      BringUp::Failed(reason) => assert!(reason.contains("restarting")),
      other => panic!("unexpected outcome: {other:?}"),
    }
  }

  #[tokio::test]
  async fn start_failure_is_reported() {
    let (controller, _) = controller(
      ScriptedRuntime::new("ichiran-main-1").with_start_failure("no such container"),
    );
    match controller.bring_up(Duration::from_secs(5)).await {
      BringUp::Failed(reason) => assert!(reason.contains("no such container")),
      other => panic!("unexpected outcome: {other:?}"),
    }
  }

  #[tokio::test]
  async fn log_subscription_failure_is_reported() {
    let (controller, runtime) = controller(
      ScriptedRuntime::new("ichiran-main-1").with_logs_failure("daemon unreachable"),
    );
    match controller.bring_up(Duration::from_secs(5)).await {
      BringUp::Failed(reason) => assert!(reason.contains("daemon unreachable")),
      other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(runtime.start_calls(), 0);
  }

  #[tokio::test]
  async fn sentinel_from_a_previous_run_waits_for_start() {
    let (controller, runtime) = controller(
      ScriptedRuntime::new("ichiran-main-1")
        .with_state(ContainerState::Exited)
        .with_log_line(SENTINEL)
        .with_start_delay(Duration::from_millis(200)),
    );

    assert_eq!(controller.bring_up(Duration::from_secs(5)).await, BringUp::Ready);
    assert_eq!(runtime.start_calls(), 1);
    assert_eq!(runtime.inspect().await.unwrap().state, ContainerState::Running);
  }

  #[tokio::test]
  async fn slow_start_still_honours_the_deadline() {
    let (controller, _) = controller(
      ScriptedRuntime::new("ichiran-main-1")
        .with_state(ContainerState::Exited)
        .with_log_line(SENTINEL)
        .with_start_delay(Duration::from_secs(5)),
    );
    assert_eq!(
      controller.bring_up(Duration::from_millis(200)).await,
      BringUp::TimedOut
    );
  }

  // ─── Deadline ───

  #[tokio::test]
  async fn missing_sentinel_times_out_on_schedule() {
    let timeout = Duration::from_millis(200);
    let (controller, _) = controller(
      ScriptedRuntime::new("ichiran-main-1").with_log_line("still compiling"),
    );

    let started = std::time::Instant::now();
    let outcome = controller.bring_up(timeout).await;
    let elapsed = started.elapsed();

    assert_eq!(outcome, BringUp::TimedOut);
    assert!(elapsed >= timeout);
    assert!(elapsed < timeout + Duration::from_secs(1));
  }

  #[tokio::test]
  async fn closed_log_stream_is_followed_again() {
    let (controller, _) = controller(
      ScriptedRuntime::new("ichiran-main-1")
        .with_log_line("booting")
        .with_logs_kept_open(false),
    );
    // The listener keeps resubscribing; only the deadline ends the wait.
    assert_eq!(
      controller.bring_up(Duration::from_millis(1500)).await,
      BringUp::TimedOut
    );
  }

  // ─── State ───

  #[test]
  fn outcome_states() {
    assert_eq!(BringUp::TimedOut.state(), ReadinessState::TimedOut);
    assert_eq!(BringUp::Failed("x".into()).state(), ReadinessState::Failed);
    assert_eq!(ReadinessState::TimedOut.to_string(), "timed_out");
  }
}
