//! APIエラー定義

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use furikae::FurikaeError;

/// エラーの種類
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiErrorKind {
  /// 入力値が無効
  InvalidInput,
  /// テキストが長すぎる
  TextTooLong,
  /// アナライザーが利用できない
  Unavailable,
  /// アナライザーの応答が不正
  Analyzer,
  /// 解析がタイムアウトした
  Timeout,
  /// 内部エラー
  Internal,
  /// 設定エラー
  Config,
}

impl ApiErrorKind {
  /// エラーコードを取得
  #[must_use]
  pub fn code(&self) -> &'static str {
    match self {
      Self::InvalidInput => "invalid_input",
      Self::TextTooLong => "text_too_long",
      Self::Unavailable => "analyzer_unavailable",
      Self::Analyzer => "analyzer_error",
      Self::Timeout => "analyzer_timeout",
      Self::Internal => "internal_error",
      Self::Config => "config_error",
    }
  }

  /// HTTPステータスコードを取得
  #[must_use]
  pub fn status(&self) -> StatusCode {
    match self {
      Self::InvalidInput | Self::TextTooLong => StatusCode::BAD_REQUEST,
      Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
      Self::Analyzer => StatusCode::BAD_GATEWAY,
      Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
      Self::Internal | Self::Config => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

/// APIエラー
#[derive(Debug, Error)]
pub enum ApiError {
  /// 入力値が無効
  #[error("入力値が無効です: {0}")]
  InvalidInput(String),

  /// テキストが長すぎる
  #[error("テキストが長すぎます: {0} バイト（最大: {1} バイト）")]
  TextTooLong(usize, usize),

  /// アナライザーが利用できない
  #[error("アナライザーが利用できません: {0}")]
  Unavailable(String),

  /// アナライザーの応答が不正
  #[error("アナライザーの応答が不正です: {0}")]
  Analyzer(String),

  /// 解析がタイムアウトした
  #[error("解析がタイムアウトしました: {0}")]
  Timeout(String),

  /// 内部エラー
  #[error("内部エラー: {0}")]
  Internal(String),

  /// 設定エラー
  #[error("設定エラー: {0}")]
  Config(String),
}

impl ApiError {
  /// エラーの種類を取得
  #[must_use]
  pub fn kind(&self) -> ApiErrorKind {
    match self {
      Self::InvalidInput(_) => ApiErrorKind::InvalidInput,
      Self::TextTooLong(_, _) => ApiErrorKind::TextTooLong,
      Self::Unavailable(_) => ApiErrorKind::Unavailable,
      Self::Analyzer(_) => ApiErrorKind::Analyzer,
      Self::Timeout(_) => ApiErrorKind::Timeout,
      Self::Internal(_) => ApiErrorKind::Internal,
      Self::Config(_) => ApiErrorKind::Config,
    }
  }

  /// エラーコードを取得
  #[must_use]
  pub fn code(&self) -> &'static str {
    self.kind().code()
  }

  /// HTTPステータスコードを取得
  #[must_use]
  pub fn status(&self) -> StatusCode {
    self.kind().status()
  }

  /// 無効な入力エラーを作成
  #[must_use]
  pub fn invalid_input(message: impl Into<String>) -> Self {
    Self::InvalidInput(message.into())
  }

  /// テキスト長超過エラーを作成
  #[must_use]
  pub fn text_too_long(actual: usize, max: usize) -> Self {
    Self::TextTooLong(actual, max)
  }

  /// 内部エラーを作成
  #[must_use]
  pub fn internal(message: impl Into<String>) -> Self {
    Self::Internal(message.into())
  }

  /// 設定エラーを作成
  #[must_use]
  pub fn config(message: impl Into<String>) -> Self {
    Self::Config(message.into())
  }
}

/// エラーレスポンスのJSON構造
#[derive(Serialize)]
struct ErrorResponse {
  error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
  code: &'static str,
  message: String,
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::warn!(code = self.code(), error = %self, "request failed");
    }
    let body = ErrorResponse {
      error: ErrorBody {
        code: self.code(),
        message: self.to_string(),
      },
    };

    (status, Json(body)).into_response()
  }
}

/// FurikaeError から ApiError への変換
///
/// アナライザーが起動していない場合は 503、応答が壊れている場合は 502 とする。
impl From<FurikaeError> for ApiError {
  fn from(err: FurikaeError) -> Self {
    match err {
      FurikaeError::InvalidInput { reason } => ApiError::invalid_input(reason),
      FurikaeError::Provisioning(e) => ApiError::Unavailable(e.to_string()),
      FurikaeError::Timeout { .. } => ApiError::Timeout(err.to_string()),
      FurikaeError::Protocol(_) | FurikaeError::Decode(_) | FurikaeError::Execution(_) => {
        ApiError::Analyzer(err.to_string())
      }
      FurikaeError::Config(e) => ApiError::config(e.to_string()),
      // #[non_exhaustive] な enum のため、将来追加されるバリアントに対応
      _ => ApiError::internal(format!("unknown error: {err}")),
    }
  }
}

/// Result 型エイリアス
pub type Result<T> = std::result::Result<T, ApiError>;
