//! furikae 日本語解析ライブラリー
//!
//! コンテナ内の ichiran アナライザーで日本語テキストを解析し、
//! 漢字頻度に基づく選択的なかな書き換えを行う

/// コマンドモジュール - exec 実行、出力ストリームの分離、JSON 行の抽出
pub mod command;

/// 設定モジュール - FurikaeConfig 等の設定構造体を定義
pub mod config;

/// デコーダーモジュール - アナライザーの JSON をトークン列に変換
pub mod decoder;

/// エラーモジュール - FurikaeError, FurikaeResult等のエラー型を定義
pub mod errors;

/// データモデルモジュール - Token, TokenSequence, ProcessingDecision等のデータ構造を定義
pub mod models;

/// 起動待ちモジュール - コンテナ起動と準備完了ログの検出
pub mod readiness;

/// ランタイムモジュール - ContainerRuntime トレイトと Docker Engine API 実装
pub mod runtime;

/// サービスモジュール - Furikae 等の上位レベルAPIを提供
pub mod service;

/// かな書き換えモジュール - 漢字頻度表と選択的かな書き換え
pub mod transliteration;

/// 再エクスポート
pub use config::FurikaeConfig;
pub use errors::{FurikaeError, FurikaeResult};
pub use models::{ProcessingDecision, ProcessingStatus, Token, TokenSequence, TransliterationResult};
pub use runtime::{ContainerRuntime, ContainerState};
pub use service::{Furikae, close_default, default_instance};
