//! ルーター定義

use std::future::Future;

use axum::{
  Router,
  routing::{get, post},
};
use tower_http::trace::TraceLayer;

use super::handlers::{get_status, health_check, post_analyze, post_transliterate};
use super::state::AppState;
use crate::errors::ApiError;

/// APIルーターを作成する
///
/// # Arguments
/// * `state` - アプリケーション状態
///
/// # Returns
/// 設定済みの Router
pub fn create_router(state: AppState) -> Router {
  Router::new()
    .route("/analyze", post(post_analyze))
    .route("/transliterate", post(post_transliterate))
    .route("/status", get(get_status))
    .route("/health", get(health_check))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// サーバーを起動する
///
/// `shutdown` が完了すると処理中のリクエストを待ってから終了する。
///
/// # Arguments
/// * `state` - アプリケーション状態
/// * `shutdown` - 終了の合図
///
/// # Errors
/// サーバーの起動に失敗した場合にエラーを返す
pub async fn run_server(
  state: AppState,
  shutdown: impl Future<Output = ()> + Send + 'static,
) -> crate::errors::Result<()> {
  let addr = state.config.bind_addr.clone();
  let listener = tokio::net::TcpListener::bind(&addr)
    .await
    .map_err(|e| ApiError::config(format!("バインドに失敗しました: {}", e)))?;

  tracing::info!("server listening on http://{}", addr);

  let router = create_router(state);

  axum::serve(listener, router)
    .with_graceful_shutdown(shutdown)
    .await
    .map_err(|e| ApiError::internal(format!("サーバーエラー: {}", e)))?;

  tracing::info!("server stopped");
  Ok(())
}

/// Ctrl+C で完了する終了の合図
pub async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to install Ctrl+C handler");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutdown requested");
}
