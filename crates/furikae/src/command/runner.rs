//! One-shot command execution inside the analyzer container

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use super::demux::demux;
use crate::errors::{
  DEFAULT_EXCERPT_BYTES, ExecutionError, FurikaeResult, ProtocolError, ProvisioningError,
  truncate_for_log,
};
use crate::runtime::ContainerRuntime;

/// Analyzer command line tool inside the container.
const ANALYZER_CLI: &str = "ichiran-cli";

/// Output of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
  /// stdout and stderr merged and trimmed
  pub output: Vec<u8>,
  /// Exit code (always 0 when returned from [`CommandRunner::run`])
  pub exit_code: i64,
}

/// Escapes `text` for interpolation into a POSIX shell command line.
///
/// One leading `-` of the escaped result is dropped afterwards: the analyzer CLI reads a
/// leading hyphen as a cluster of short options, not as text. Unquoted output only begins
/// with `-` when the input did.
pub fn shell_argument(text: &str) -> String {
  let escaped = shell_escape::unix::escape(Cow::Borrowed(text));
  match escaped.strip_prefix('-') {
    Some(rest) => rest.to_string(),
    None => escaped.into_owned(),
  }
}

/// `bash -c "ichiran-cli -f <text>"`: full analysis of `text` as JSON.
pub fn analysis_command(text: &str) -> Vec<String> {
  vec![
    "bash".to_string(),
    "-c".to_string(),
    format!("{ANALYZER_CLI} -f {}", shell_argument(text)),
  ]
}

/// `bash -c "ichiran-cli -e <form>"`: kanji-level reading match of `surface` against `kana`.
///
/// Spaces are removed from `kana`; the matcher rejects them.
pub fn kanji_readings_command(surface: &str, kana: &str) -> Vec<String> {
  let kana: String = kana.chars().filter(|c| !c.is_whitespace()).collect();
  let form = format!(
    "(jsown:to-json (ichiran/kanji:match-readings-json \"{}\" \"{}\"))",
    lisp_string(surface),
    lisp_string(&kana)
  );
  vec![
    "bash".to_string(),
    "-c".to_string(),
    format!("{ANALYZER_CLI} -e {}", shell_argument(&form)),
  ]
}

/// Escapes string content for a Lisp string literal.
fn lisp_string(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for c in s.chars() {
    if matches!(c, '\\' | '"') {
      out.push('\\');
    }
    out.push(c);
  }
  out
}

/// Runs commands against the analyzer container, one exec unit per call.
#[derive(Clone)]
pub struct CommandRunner {
  runtime: Arc<dyn ContainerRuntime>,
}

impl CommandRunner {
  /// Creates a runner bound to `runtime`.
  pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
    Self { runtime }
  }

  /// Executes `argv` and returns its merged output.
  ///
  /// # Flow
  /// 1. Inspect the container; it must be running
  /// 2. Create an exec unit as the container's configured user
  /// 3. Attach and demultiplex the output
  /// 4. Read the exit code
  ///
  /// # Errors
  /// - Inspect failure or a non-running container: `ProvisioningError`
  /// - Exec creation or attach failure: `ProvisioningError`
  /// - Truncated output stream: `ProtocolError::Demux`
  /// - Non-zero or missing exit code: `ExecutionError`
  pub async fn run(&self, argv: &[String]) -> FurikaeResult<ExecOutput> {
    let container = self.runtime.name();
    let started = Instant::now();

    let info = self
      .runtime
      .inspect()
      .await
      .map_err(|source| ProvisioningError::Inspect {
        container: container.to_string(),
        source,
      })?;
    if !info.state.is_running() {
      return Err(
        ProvisioningError::NotRunning {
          container: container.to_string(),
          state: info.state,
        }
        .into(),
      );
    }

    let exec = self
      .runtime
      .create_exec(info.user.as_deref(), argv)
      .await
      .map_err(|source| ProvisioningError::ExecCreate {
        container: container.to_string(),
        source,
      })?;

    let stream = self
      .runtime
      .start_exec(&exec)
      .await
      .map_err(|source| ProvisioningError::Attach {
        container: container.to_string(),
        source,
      })?;

    let output = demux(stream).await.map_err(|e| ProtocolError::Demux(Arc::new(e)))?;

    let exit_code = self
      .runtime
      .exec_exit_code(&exec)
      .await
      .map_err(|source| ProvisioningError::ExecInspect {
        exec_id: exec.to_string(),
        source,
      })?
      .ok_or_else(|| ExecutionError::MissingExitCode {
        exec_id: exec.to_string(),
      })?;

    debug!(
      container,
      exec_id = %exec,
      exit_code,
      output_bytes = output.len(),
      elapsed_ms = started.elapsed().as_millis() as u64,
      "exec finished"
    );

    if exit_code != 0 {
      let output = truncate_for_log(&String::from_utf8_lossy(&output), DEFAULT_EXCERPT_BYTES);
      warn!(container, exec_id = %exec, exit_code, "command failed");
      return Err(ExecutionError::NonZeroExit { exit_code, output }.into());
    }

    Ok(ExecOutput { output, exit_code })
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Test Module
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;
  use crate::errors::FurikaeError;
  use crate::runtime::{ContainerState, ScriptedExec, ScriptedRuntime};

  // ─── Escaping ──────────────────────────────────────────────────────────

  #[test]
  fn shell_argument_quotes_text_with_spaces() {
    assert_eq!(shell_argument("hello world"), "'hello world'");
  }

  #[test]
  fn shell_argument_strips_leading_hyphen() {
    assert_eq!(shell_argument("-hello"), "hello");
    assert_eq!(shell_argument("hello-world"), "hello-world");
  }

  #[test]
  fn shell_argument_quotes_japanese_and_quotes() {
    assert_eq!(shell_argument("私は"), "'私は'");
    assert_eq!(shell_argument("it's"), "'it'\\''s'");
  }

  #[test]
  fn analysis_command_wraps_in_bash() {
    let argv = analysis_command("日本語 です");
    assert_eq!(argv, vec!["bash", "-c", "ichiran-cli -f '日本語 です'"]);
  }

  #[test]
  fn kanji_command_removes_kana_spaces() {
    let argv = kanji_readings_command("だから", "だ から");
    assert_eq!(argv[0], "bash");
    assert!(argv[2].starts_with("ichiran-cli -e '(jsown:to-json"));
    assert!(argv[2].contains(r#"match-readings-json "だから" "だから""#));
  }

  #[test]
  fn lisp_string_escapes_quotes_and_backslashes() {
    assert_eq!(lisp_string(r#"a"b\c"#), r#"a\"b\\c"#);
  }

  // ─── CommandRunner ─────────────────────────────────────────────────────

  #[tokio::test]
  async fn run_returns_merged_output() {
    let runtime = ScriptedRuntime::new("main").with_exec(
      "ichiran-cli -f",
      ScriptedExec::stdout("[\"ok\"]\n").with_stderr_prefix("note\n"),
    );
    let runner = CommandRunner::new(Arc::new(runtime));

    let out = runner.run(&analysis_command("x")).await.unwrap();
    assert_eq!(out.output, b"note\n[\"ok\"]");
    assert_eq!(out.exit_code, 0);
  }

  #[tokio::test]
  async fn run_requires_running_container() {
    let runtime = ScriptedRuntime::new("main").with_state(ContainerState::Exited);
    let runner = CommandRunner::new(Arc::new(runtime));

    let err = runner.run(&analysis_command("x")).await.unwrap_err();
    assert!(matches!(
      err,
      FurikaeError::Provisioning(ProvisioningError::NotRunning {
        state: ContainerState::Exited,
        ..
      })
    ));
  }

  #[tokio::test]
  async fn run_reports_non_zero_exit_with_output() {
    let runtime = ScriptedRuntime::new("main").with_exec(
      "ichiran-cli",
      ScriptedExec::stdout("Unhandled SIMPLE-ERROR").with_exit_code(Some(1)),
    );
    let runner = CommandRunner::new(Arc::new(runtime));

    let err = runner.run(&analysis_command("x")).await.unwrap_err();
    match err {
      FurikaeError::Execution(ExecutionError::NonZeroExit { exit_code, output }) => {
        assert_eq!(exit_code, 1);
        assert_eq!(output, "Unhandled SIMPLE-ERROR");
      }
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[tokio::test]
  async fn run_reports_missing_exit_code() {
    let runtime = ScriptedRuntime::new("main")
      .with_exec("ichiran-cli", ScriptedExec::stdout("[]").with_exit_code(None));
    let runner = CommandRunner::new(Arc::new(runtime));

    let err = runner.run(&analysis_command("x")).await.unwrap_err();
    assert!(matches!(
      err,
      FurikaeError::Execution(ExecutionError::MissingExitCode { .. })
    ));
  }

  #[tokio::test]
  async fn attach_failure_is_provisioning_error() {
    let runtime = ScriptedRuntime::new("main");
    let runner = CommandRunner::new(Arc::new(runtime));

    let err = runner.run(&analysis_command("x")).await.unwrap_err();
    assert!(matches!(
      err,
      FurikaeError::Provisioning(ProvisioningError::Attach { .. })
    ));
  }

  #[tokio::test]
  async fn each_run_uses_a_new_exec_unit() {
    let runtime = Arc::new(
      ScriptedRuntime::new("main")
        .with_user("ichiran")
        .with_exec("ichiran-cli", ScriptedExec::stdout("[]")),
    );
    let runner = CommandRunner::new(runtime.clone());

    runner.run(&analysis_command("a")).await.unwrap();
    runner.run(&analysis_command("b")).await.unwrap();
    assert_eq!(runtime.executed().len(), 2);
  }
}
