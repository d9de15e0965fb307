//! Analysis and Transliteration Service

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use furikae::Furikae;

use crate::config::{Config, MAX_TEXT_LENGTH};
use crate::errors::{ApiError, Result};
use crate::models::{
  AnalyzeRequest, AnalyzeResponse, StatusResponse, TransliterateRequest, TransliterateResponse,
};

/// Common interface for the HTTP-facing service
///
/// This trait allows swapping production implementation (`FurikaeApiServiceFull`) with
/// test stubs/mocks.
#[async_trait]
pub trait FurikaeApiService: Send + Sync {
  /// Analyzes text into tokens
  ///
  /// # Errors
  /// - Input error (empty string, length exceeded)
  /// - Analyzer unavailable, broken answer or timeout
  async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalyzeResponse>;

  /// Analyzes text and rewrites infrequent or irregular kanji in kana
  ///
  /// # Errors
  /// Same as [`FurikaeApiService::analyze`], plus frequency table errors
  async fn transliterate(&self, request: TransliterateRequest) -> Result<TransliterateResponse>;

  /// Reports the analyzer container state
  ///
  /// # Errors
  /// Returns an error if the container cannot be inspected
  async fn status(&self) -> Result<StatusResponse>;
}

/// Rejects empty and oversized input before it reaches the analyzer.
///
/// # Errors
/// `invalid_input` for empty text, `text_too_long` above [`MAX_TEXT_LENGTH`] bytes
pub fn validate_text(text: &str) -> Result<()> {
  let text_bytes = text.len();
  if text.trim().is_empty() {
    return Err(ApiError::invalid_input("Text is empty"));
  }
  if text_bytes > MAX_TEXT_LENGTH {
    return Err(ApiError::text_too_long(text_bytes, MAX_TEXT_LENGTH));
  }
  Ok(())
}

fn elapsed_ms(start: Instant) -> u64 {
  u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Service backed by the analyzer container
#[derive(Clone)]
pub struct FurikaeApiServiceFull {
  inner: Arc<Furikae>,
}

impl FurikaeApiServiceFull {
  /// Initializes the service
  ///
  /// The container is not touched here; it is brought up by the first request
  /// or by [`FurikaeApiServiceFull::warm_up`].
  ///
  /// # Errors
  /// Returns an error if the configuration is invalid
  pub fn new(config: &Config) -> Result<Self> {
    let inner = Furikae::new(config.to_furikae_config())?;
    Ok(Self::from_furikae(Arc::new(inner)))
  }

  /// Wraps an existing handle
  #[must_use]
  pub fn from_furikae(inner: Arc<Furikae>) -> Self {
    Self { inner }
  }

  /// Brings the analyzer up ahead of the first request
  ///
  /// # Errors
  /// Returns an error if the container does not become ready
  pub async fn warm_up(&self) -> Result<()> {
    self.inner.init().await?;
    // Loads the frequency table so a broken file is reported by the warm-up.
    self.inner.frequency_table()?;
    Ok(())
  }
}

#[async_trait]
impl FurikaeApiService for FurikaeApiServiceFull {
  async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalyzeResponse> {
    validate_text(&request.text)?;

    let start = Instant::now();
    let tokens = self.inner.analyze(&request.text).await?;
    Ok(AnalyzeResponse::from_tokens(&tokens, elapsed_ms(start)))
  }

  async fn transliterate(&self, request: TransliterateRequest) -> Result<TransliterateResponse> {
    validate_text(&request.text)?;

    let start = Instant::now();
    let result = self
      .inner
      .analyze_and_transliterate(&request.text, request.threshold)
      .await?;
    Ok(TransliterateResponse::from_result(result, elapsed_ms(start)))
  }

  async fn status(&self) -> Result<StatusResponse> {
    let state = self.inner.status().await?;
    Ok(StatusResponse {
      container: self.inner.config().container_name().to_string(),
      state,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use furikae::{FurikaeConfig, ProcessingStatus};
  use furikae::config::DEFAULT_READY_SENTINEL;
  use furikae::runtime::{ScriptedExec, ScriptedRuntime};

  const ANALYSIS: &str = r#"[[[[["nihongo",{"text":"日本語","kana":"にほんご","gloss":[{"pos":"[n]","gloss":"Japanese language"}]},[]]],100]],"。"]"#;

  fn service(runtime: ScriptedRuntime) -> FurikaeApiServiceFull {
    let mut config = FurikaeConfig::default();
    config.analysis.fetch_kanji_readings = false;
    let furikae = Furikae::with_runtime(config, Arc::new(runtime)).unwrap();
    FurikaeApiServiceFull::from_furikae(Arc::new(furikae))
  }

  fn ready_runtime() -> ScriptedRuntime {
    ScriptedRuntime::new("ichiran-main-1")
      .with_log_line(DEFAULT_READY_SENTINEL)
      .with_exec("ichiran-cli -f", ScriptedExec::stdout(ANALYSIS))
  }

  // ─── Validation ───

  #[test]
  fn empty_text_is_invalid() {
    assert_eq!(validate_text("").unwrap_err().code(), "invalid_input");
    assert_eq!(validate_text(" \n").unwrap_err().code(), "invalid_input");
  }

  #[test]
  fn text_over_the_limit_is_rejected() {
    assert!(validate_text(&"a".repeat(MAX_TEXT_LENGTH)).is_ok());
    let err = validate_text(&"a".repeat(MAX_TEXT_LENGTH + 1)).unwrap_err();
    assert_eq!(err.code(), "text_too_long");
  }

  // ─── Scripted analyzer ───

  #[tokio::test]
  async fn analyze_returns_every_view() {
    let service = service(ready_runtime());
    let response = service
      .analyze(AnalyzeRequest {
        text: "日本語。".to_string(),
      })
      .await
      .unwrap();

    assert_eq!(response.tokens.len(), 2);
    assert_eq!(response.tokens[0].surface, "日本語");
    assert_eq!(response.kana, "にほんご。");
    assert!(response.gloss.contains("Japanese language"));
  }

  #[tokio::test]
  async fn empty_text_never_reaches_the_container() {
    let runtime = Arc::new(ready_runtime());
    let furikae = Furikae::with_runtime(FurikaeConfig::default(), runtime.clone()).unwrap();
    let service = FurikaeApiServiceFull::from_furikae(Arc::new(furikae));

    let err = service
      .analyze(AnalyzeRequest {
        text: String::new(),
      })
      .await
      .unwrap_err();
    assert_eq!(err.code(), "invalid_input");
    assert!(runtime.executed().is_empty());
    assert_eq!(runtime.start_calls(), 0);
  }

  #[tokio::test]
  async fn transliterate_without_readings_keeps_the_surface() {
    let service = service(ready_runtime());
    let response = service
      .transliterate(TransliterateRequest {
        text: "日本語。".to_string(),
        threshold: Some(0),
      })
      .await
      .unwrap();

    assert_eq!(response.text, "日本語。");
    assert_eq!(
      response.decisions[0].status,
      ProcessingStatus::TransliteratedUnmappable
    );
  }

  #[tokio::test]
  async fn failed_bring_up_is_unavailable() {
    let service = service(ScriptedRuntime::new("ichiran-main-1").with_start_failure("no such container"));
    let err = service
      .analyze(AnalyzeRequest {
        text: "日本".to_string(),
      })
      .await
      .unwrap_err();
    assert_eq!(err.status(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
  }

  #[tokio::test]
  async fn status_reports_container_state() {
    let service = service(ready_runtime());
    let status = service.status().await.unwrap();
    assert_eq!(status.container, "ichiran-main-1");
  }

  // Container-dependent tests are opt-in with with_docker_tests feature
  #[tokio::test]
  #[cfg_attr(not(feature = "with_docker_tests"), ignore)]
  async fn live_container_round_trip() {
    let service = FurikaeApiServiceFull::new(&Config::from_env().unwrap())
      .expect("Failed to build service: check FURIKAE_* variables");
    service.warm_up().await.expect("analyzer should come up");

    let response = service
      .transliterate(TransliterateRequest {
        text: "私は日本語を勉強します。".to_string(),
        threshold: None,
      })
      .await
      .unwrap();
    assert!(response.text.ends_with('。'));
    assert!(!response.decisions.is_empty());
  }
}
