//! Docker Engine API implementation of [`ContainerRuntime`]
//!
//! Talks to the engine over HTTP (`container.docker_host`), so the daemon must expose
//! a TCP endpoint or be reached through a proxy.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{
  ContainerInfo, ContainerRuntime, ContainerState, ExecId, ExecOutputStream, LogLine,
  LogSubscription,
};
use crate::command::demux::{Frame, FrameDecoder, StreamKind};
use crate::config::FurikaeConfig;
use crate::errors::{ConfigError, DEFAULT_EXCERPT_BYTES, RuntimeError, truncate_for_log};

/// Buffered log lines before the feeding task waits for the reader.
const LOG_CHANNEL_CAPACITY: usize = 256;

/// TCP connect timeout towards the engine.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Docker Engine HTTP client bound to one analyzer container.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
  client: reqwest::Client,
  base_url: String,
  container: String,
  companions: Vec<String>,
}

// ===== Wire types =====

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectResponse {
  #[serde(default)]
  state: Option<InspectState>,
  #[serde(default)]
  config: Option<InspectConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectState {
  #[serde(default)]
  status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectConfig {
  #[serde(default)]
  user: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ExecCreateRequest<'a> {
  attach_stdout: bool,
  attach_stderr: bool,
  tty: bool,
  cmd: &'a [String],
  #[serde(skip_serializing_if = "Option::is_none")]
  user: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ExecCreateResponse {
  id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ExecStartRequest {
  detach: bool,
  tty: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ExecInspectResponse {
  #[serde(default)]
  running: bool,
  #[serde(default)]
  exit_code: Option<i64>,
}

impl DockerRuntime {
  /// Builds a client from the `[container]` section.
  pub fn new(config: &FurikaeConfig) -> Result<Self, ConfigError> {
    let client = reqwest::Client::builder()
      .connect_timeout(CONNECT_TIMEOUT)
      .build()
      .map_err(|e| ConfigError::HttpClient(Arc::new(e)))?;

    Ok(Self {
      client,
      base_url: config.docker_host().to_string(),
      container: config.container_name().to_string(),
      companions: config.companion_containers().to_vec(),
    })
  }

  fn container_url(&self, container: &str, action: &str) -> String {
    format!("{}/containers/{}/{}", self.base_url, container, action)
  }

  fn exec_url(&self, exec: &ExecId, action: &str) -> String {
    format!("{}/exec/{}/{}", self.base_url, exec.as_str(), action)
  }

  /// Start or stop one container. 304 (already in the requested state) counts as success.
  async fn post_lifecycle(
    &self,
    operation: &'static str,
    container: &str,
    action: &str,
  ) -> Result<(), RuntimeError> {
    let response = self
      .client
      .post(self.container_url(container, action))
      .send()
      .await
      .map_err(http_error(operation))?;

    if response.status() == reqwest::StatusCode::NOT_MODIFIED {
      debug!(container, operation, "container already in requested state");
      return Ok(());
    }
    check_status(operation, container, response).await?;
    Ok(())
  }
}

fn http_error(operation: &'static str) -> impl FnOnce(reqwest::Error) -> RuntimeError {
  move |e| RuntimeError::Http {
    operation,
    source: Arc::new(e),
  }
}

/// Passes through 2xx responses and converts everything else into a [`RuntimeError`].
async fn check_status(
  operation: &'static str,
  container: &str,
  response: reqwest::Response,
) -> Result<reqwest::Response, RuntimeError> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }
  if status == reqwest::StatusCode::NOT_FOUND {
    return Err(RuntimeError::NotFound {
      container: container.to_string(),
    });
  }

  let body = response.text().await.unwrap_or_default();
  Err(RuntimeError::Status {
    operation,
    status: status.as_u16(),
    body: truncate_for_log(&body, DEFAULT_EXCERPT_BYTES),
  })
}

async fn read_json<T: serde::de::DeserializeOwned>(
  operation: &'static str,
  response: reqwest::Response,
) -> Result<T, RuntimeError> {
  let bytes = response.bytes().await.map_err(http_error(operation))?;
  serde_json::from_slice(&bytes).map_err(|e| RuntimeError::InvalidResponse {
    operation,
    reason: e.to_string(),
  })
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
  fn name(&self) -> &str {
    &self.container
  }

  async fn inspect(&self) -> Result<ContainerInfo, RuntimeError> {
    let response = self
      .client
      .get(self.container_url(&self.container, "json"))
      .send()
      .await
      .map_err(http_error("inspect"))?;
    let response = check_status("inspect", &self.container, response).await?;
    let body: InspectResponse = read_json("inspect", response).await?;

    let state = body
      .state
      .map(|s| ContainerState::from_status(&s.status))
      .unwrap_or(ContainerState::Unknown);
    let user = body.config.and_then(|c| c.user).filter(|u| !u.trim().is_empty());

    Ok(ContainerInfo { state, user })
  }

  async fn start(&self) -> Result<(), RuntimeError> {
    for companion in &self.companions {
      info!(container = %companion, "starting companion container");
      self.post_lifecycle("start", companion, "start").await?;
    }
    info!(container = %self.container, "starting analyzer container");
    self.post_lifecycle("start", &self.container, "start").await
  }

  async fn logs(&self) -> Result<LogSubscription, RuntimeError> {
    let url = format!(
      "{}?follow=true&stdout=true&stderr=true&tail=all",
      self.container_url(&self.container, "logs")
    );
    let response = self.client.get(url).send().await.map_err(http_error("logs"))?;
    let response = check_status("logs", &self.container, response).await?;

    let (tx, rx) = mpsc::channel(LOG_CHANNEL_CAPACITY);
    tokio::spawn(forward_logs(self.container.clone(), response, tx));
    Ok(rx)
  }

  async fn create_exec(&self, user: Option<&str>, argv: &[String]) -> Result<ExecId, RuntimeError> {
    let request = ExecCreateRequest {
      attach_stdout: true,
      attach_stderr: true,
      tty: false,
      cmd: argv,
      user,
    };
    let response = self
      .client
      .post(self.container_url(&self.container, "exec"))
      .json(&request)
      .send()
      .await
      .map_err(http_error("exec_create"))?;
    let response = check_status("exec_create", &self.container, response).await?;
    let created: ExecCreateResponse = read_json("exec_create", response).await?;

    debug!(exec_id = %created.id, "exec created");
    Ok(ExecId(created.id))
  }

  async fn start_exec(&self, exec: &ExecId) -> Result<ExecOutputStream, RuntimeError> {
    let response = self
      .client
      .post(self.exec_url(exec, "start"))
      .json(&ExecStartRequest {
        detach: false,
        tty: false,
      })
      .send()
      .await
      .map_err(http_error("exec_start"))?;
    let response = check_status("exec_start", &self.container, response).await?;

    // The engine closes the stream when the command exits.
    let body = response.bytes().await.map_err(http_error("exec_start"))?;
    Ok(Box::new(std::io::Cursor::new(body)))
  }

  async fn exec_exit_code(&self, exec: &ExecId) -> Result<Option<i64>, RuntimeError> {
    let response = self
      .client
      .get(self.exec_url(exec, "json"))
      .send()
      .await
      .map_err(http_error("exec_inspect"))?;
    let response = check_status("exec_inspect", &self.container, response).await?;
    let body: ExecInspectResponse = read_json("exec_inspect", response).await?;

    if body.running {
      return Ok(None);
    }
    Ok(body.exit_code)
  }

  async fn stop(&self) -> Result<(), RuntimeError> {
    info!(container = %self.container, "stopping analyzer container");
    self.post_lifecycle("stop", &self.container, "stop").await
  }
}

/// Reads the followed log body and forwards complete lines until the receiver is dropped.
async fn forward_logs(container: String, mut response: reqwest::Response, tx: mpsc::Sender<LogLine>) {
  let mut decoder = FrameDecoder::new();
  let mut lines = LineAssembler::default();

  loop {
    let chunk = tokio::select! {
      _ = tx.closed() => return,
      chunk = response.chunk() => chunk,
    };

    match chunk {
      Ok(Some(bytes)) => {
        for frame in decoder.push(&bytes) {
          for line in lines.push(frame) {
            if tx.send(line).await.is_err() {
              return;
            }
          }
        }
      }
      Ok(None) => break,
      Err(e) => {
        warn!(container = %container, error = %e, "log stream interrupted");
        break;
      }
    }
  }

  for line in lines.finish() {
    if tx.send(line).await.is_err() {
      return;
    }
  }
  debug!(container = %container, "log stream ended");
}

/// Joins frame payloads into newline-terminated lines, per stream.
#[derive(Debug, Default)]
struct LineAssembler {
  partial: HashMap<StreamKind, Vec<u8>>,
}

impl LineAssembler {
  fn push(&mut self, frame: Frame) -> Vec<LogLine> {
    let buffer = self.partial.entry(frame.stream).or_default();
    buffer.extend_from_slice(&frame.payload);

    let mut lines = Vec::new();
    while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
      let raw: Vec<u8> = buffer.drain(..=pos).collect();
      lines.push(to_log_line(frame.stream, &raw));
    }
    lines
  }

  fn finish(self) -> Vec<LogLine> {
    self
      .partial
      .into_iter()
      .filter(|(_, rest)| !rest.is_empty())
      .map(|(stream, rest)| to_log_line(stream, &rest))
      .collect()
  }
}

fn to_log_line(stream: StreamKind, raw: &[u8]) -> LogLine {
  let text = String::from_utf8_lossy(raw);
  LogLine {
    stream,
    text: text.trim_end_matches(['\n', '\r']).to_string(),
  }
}
