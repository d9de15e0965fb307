//! HTTPハンドラー定義

use axum::{Json, extract::State};
use tracing::{debug, info};

use crate::errors::ApiError;
use crate::models::{
  AnalyzeRequest, AnalyzeResponse, StatusResponse, TransliterateRequest, TransliterateResponse,
};

use super::state::AppState;

/// POST /analyze エンドポイント
///
/// 日本語テキストをアナライザーで解析する。
///
/// # Request Body
/// ```json
/// { "text": "解析対象のテキスト" }
/// ```
///
/// # Response
/// - 200 OK: 解析成功
/// - 400 Bad Request: 入力エラー（空テキスト、テキスト長超過）
/// - 502 Bad Gateway: アナライザーの応答が不正
/// - 503 Service Unavailable: アナライザーが起動していない
/// - 504 Gateway Timeout: 解析のタイムアウト
pub async fn post_analyze(
  State(state): State<AppState>,
  Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
  debug!(text_len = request.text.len(), "analyze request received");

  // アナライザーはコンテナ内の別プロセスなので、待機中もランタイムはブロックされない
  let response = state.service.analyze(request).await?;

  info!(
    token_count = response.tokens.len(),
    elapsed_ms = response.elapsed_ms,
    "analysis finished"
  );

  Ok(Json(response))
}

/// POST /transliterate エンドポイント
///
/// 解析結果をもとに、頻度の低い漢字と不規則な読みの漢字をかなに書き換える。
///
/// # Request Body
/// ```json
/// { "text": "書き換え対象のテキスト", "threshold": 2000 }
/// ```
///
/// `threshold` は省略可能。エラー時のステータスは `/analyze` と同じ。
pub async fn post_transliterate(
  State(state): State<AppState>,
  Json(request): Json<TransliterateRequest>,
) -> Result<Json<TransliterateResponse>, ApiError> {
  debug!(
    text_len = request.text.len(),
    threshold = ?request.threshold,
    "transliterate request received"
  );

  let response = state.service.transliterate(request).await?;

  info!(
    decision_count = response.decisions.len(),
    elapsed_ms = response.elapsed_ms,
    "transliteration finished"
  );

  Ok(Json(response))
}

/// GET /status エンドポイント
///
/// 解析コンテナの状態を返す。コンテナの起動は行わない。
pub async fn get_status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
  let response = state.service.status().await?;
  debug!(container = %response.container, state = ?response.state, "status checked");
  Ok(Json(response))
}

/// ヘルスチェックエンドポイント
///
/// サーバーが稼働しているかを確認する。
pub async fn health_check() -> &'static str {
  "OK"
}
