//! Shared fixtures for the integration tests
//!
//! The analyzer answers below follow the `ichiran-cli -f` array layout:
//! `[[[[entry, …], score]], "passthrough", …]` with `entry = [romanized, data, []]`.

#![allow(dead_code)]

use std::sync::Arc;

use furikae::config::DEFAULT_READY_SENTINEL;
use furikae::runtime::{ScriptedExec, ScriptedRuntime};
use furikae::{Furikae, FurikaeConfig};
use serde_json::{Value, json};

/// Pattern routing the analysis command.
pub const ANALYSIS_PATTERN: &str = "ichiran-cli -f";

/// Pattern routing the kanji reading command.
pub const READINGS_PATTERN: &str = "match-readings-json";

/// Diagnostics the analyzer image prints before answering.
pub const NOISE: &str = "; loading system definition from /root/quicklisp/setup.lisp\n\
; compiling (DEFPACKAGE :ICHIRAN)\n\
WARNING: redefining ICHIRAN/DICT::GET-KANA in DEFUN\n";

/// `[romanized, data, []]`
pub fn entry(romanized: &str, data: Value) -> Value {
  json!([romanized, data, []])
}

/// One segmentation group holding `entries`.
pub fn group(entries: Vec<Value>) -> Value {
  json!([[entries, 42]])
}

/// Kanji reading entry as printed by `match-readings-json`.
pub fn reading(kanji: &str, kana: &str) -> Value {
  json!({"kanji": kanji, "reading": kana, "type": "ja_on", "link": true, "geminated": ""})
}

/// The analyzer prints its `match-readings-json` answer as a JSON string.
pub fn quoted(answer: &Value) -> String {
  Value::String(answer.to_string()).to_string()
}

/// Runtime that is ready at once and answers the analysis with `analysis`.
pub fn runtime(analysis: &Value) -> ScriptedRuntime {
  ScriptedRuntime::new("ichiran-main-1")
    .with_log_line("Starting ichiran")
    .with_log_line(DEFAULT_READY_SENTINEL)
    .with_exec(
      ANALYSIS_PATTERN,
      ScriptedExec::stdout(analysis.to_string()).with_stderr_prefix(NOISE),
    )
}

/// Configuration without the per-token kanji reading call.
pub fn config_without_readings() -> FurikaeConfig {
  let mut config = FurikaeConfig::default();
  config.analysis.fetch_kanji_readings = false;
  config
}

/// Service over `runtime`.
pub fn service(config: FurikaeConfig, runtime: ScriptedRuntime) -> (Furikae, Arc<ScriptedRuntime>) {
  let runtime = Arc::new(runtime);
  let furikae = Furikae::with_runtime(config, runtime.clone()).expect("valid configuration");
  (furikae, runtime)
}
