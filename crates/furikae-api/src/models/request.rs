//! リクエストモデル定義

use serde::Deserialize;

/// 解析リクエスト
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
  /// 解析対象のテキスト
  pub text: String,
}

/// かな書き換えリクエスト
#[derive(Debug, Deserialize)]
pub struct TransliterateRequest {
  /// 書き換え対象のテキスト
  pub text: String,
  /// 頻度順位のしきい値（省略時は設定値）
  #[serde(default)]
  pub threshold: Option<usize>,
}
