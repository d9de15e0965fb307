//! furikae-api サーバーエントリーポイント

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use furikae_api::ApiError;
use furikae_api::api::{AppState, run_server, shutdown_signal};
use furikae_api::config::Config;
use furikae_api::service::FurikaeApiServiceFull;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
  // 設定の読み込み
  let config = Config::from_env()?;
  let furikae_config = config.to_furikae_config();

  // ロギングの初期化（RUST_LOG が無ければ設定のレベル）
  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(furikae_config.log_level().as_directive()));
  tracing_subscriber::registry()
    .with(filter)
    .with(tracing_subscriber::fmt::layer())
    .init();

  tracing::info!(
    container = %config.container_name,
    docker_host = %config.docker_host,
    query_timeout_secs = config.query_timeout_secs,
    "configuration loaded"
  );

  // サービスの初期化
  let service = Arc::new(FurikaeApiServiceFull::new(&config)?);

  // コンテナの起動待ちは数分かかるため、待たずに受付を始める
  let warm = Arc::clone(&service);
  tokio::spawn(async move {
    match warm.warm_up().await {
      Ok(()) => tracing::info!("analyzer warmed up"),
      Err(e) => tracing::warn!(error = %e, "analyzer warm-up failed"),
    }
  });

  // アプリケーション状態の作成
  let state = AppState::new(config, service);

  // サーバー起動
  run_server(state, shutdown_signal()).await
}
