//! エラー定義

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::runtime::ContainerState;

/// エラーメッセージに埋め込む生出力の既定最大長（バイト）
pub const DEFAULT_EXCERPT_BYTES: usize = 1000;

/// 設定（FurikaeConfig）関連のエラー
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum ConfigError {
  /// container.container_name が空
  #[error("container.container_name を指定してください")]
  EmptyContainerName,

  /// container.docker_host のスキームが http / https ではない
  #[error("container.docker_host は http:// または https:// で始まる必要があります: host={host}")]
  InvalidDockerHost {
    /// 指定された値
    host: String,
  },

  /// container.ready_sentinel が空
  #[error("container.ready_sentinel を指定してください")]
  EmptyReadySentinel,

  /// タイムアウト値が 0 秒
  #[error("{field} は 1 秒以上である必要があります: actual={actual}")]
  InvalidTimeout {
    /// 設定項目名
    field: &'static str,
    /// 実際に指定された値（秒）
    actual: u64,
  },

  /// transliteration.default_threshold < 1
  #[error("transliteration.default_threshold は 1 以上である必要があります: actual={actual}")]
  InvalidThreshold {
    /// 実際に指定された値
    actual: usize,
  },

  /// 頻度表ファイルが存在しない、またはファイルではない
  #[error("漢字頻度表が見つかりません: path={path:?}")]
  FrequencyTableNotFound {
    /// 指定されたパス
    path: PathBuf,
  },

  /// 頻度表ファイルの読み込みに失敗
  #[error("漢字頻度表の読み込みに失敗しました: path={path:?}, error={source}")]
  FrequencyTableRead {
    /// 読み込もうとしたパス
    path: PathBuf,
    /// 元となった IO エラー
    #[source]
    source: Arc<io::Error>,
  },

  /// 頻度表に文字が1つも含まれていない
  #[error("漢字頻度表が空です: source={source_name}")]
  EmptyFrequencyTable {
    /// 読み込み元の名前（パスまたは "embedded"）
    source_name: String,
  },

  /// HTTP クライアントの構築に失敗
  #[error("Docker API クライアントの構築に失敗しました: {0}")]
  HttpClient(Arc<reqwest::Error>),
}

/// コンテナランタイム（解析プロセスの提供者）から返るエラー
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum RuntimeError {
  /// HTTP 通信そのものに失敗
  #[error("{operation}: Docker API への通信に失敗しました: {source}")]
  Http {
    /// 実行していた操作名
    operation: &'static str,
    /// 元となった reqwest エラー
    #[source]
    source: Arc<reqwest::Error>,
  },

  /// Docker API が想定外のステータスを返した
  #[error("{operation}: Docker API がステータス {status} を返しました: {body}")]
  Status {
    /// 実行していた操作名
    operation: &'static str,
    /// HTTP ステータスコード
    status: u16,
    /// レスポンスボディ（切り詰め済み）
    body: String,
  },

  /// コンテナが存在しない
  #[error("コンテナが見つかりません: {container}")]
  NotFound {
    /// コンテナ名
    container: String,
  },

  /// レスポンスの形式が不正
  #[error("{operation}: Docker API のレスポンスが不正です: {reason}")]
  InvalidResponse {
    /// 実行していた操作名
    operation: &'static str,
    /// 不正の理由
    reason: String,
  },

  /// ランタイムが利用できない（停止済み等）
  #[error("コンテナランタイムが利用できません: {reason}")]
  Unavailable {
    /// 理由
    reason: String,
  },
}

/// 解析プロセスの準備・到達性に関するエラー
///
/// リクエストにとって致命的で、内部での再試行は行わない。
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum ProvisioningError {
  /// コンテナの状態取得に失敗（プロセスの同一性が不明）
  #[error("コンテナ {container} の状態取得に失敗しました: {source}")]
  Inspect {
    /// コンテナ名
    container: String,
    /// ランタイム側のエラー
    #[source]
    source: RuntimeError,
  },

  /// コンテナが running 状態ではない
  #[error("コンテナ {container} は実行中ではありません: state={state}")]
  NotRunning {
    /// コンテナ名
    container: String,
    /// 観測された状態
    state: ContainerState,
  },

  /// exec の作成に失敗
  #[error("コンテナ {container} で exec の作成に失敗しました: {source}")]
  ExecCreate {
    /// コンテナ名
    container: String,
    /// ランタイム側のエラー
    #[source]
    source: RuntimeError,
  },

  /// exec 出力ストリームへのアタッチに失敗
  #[error("コンテナ {container} の exec 出力にアタッチできませんでした: {source}")]
  Attach {
    /// コンテナ名
    container: String,
    /// ランタイム側のエラー
    #[source]
    source: RuntimeError,
  },

  /// exec の終了状態の取得に失敗
  #[error("exec {exec_id} の終了状態を取得できませんでした: {source}")]
  ExecInspect {
    /// exec ID
    exec_id: String,
    /// ランタイム側のエラー
    #[source]
    source: RuntimeError,
  },

  /// 起動処理が失敗した
  #[error("解析コンテナの起動に失敗しました: {reason}")]
  NotReady {
    /// 失敗の理由
    reason: String,
  },

  /// 起動完了の合図がタイムアウトまでに来なかった
  #[error("解析コンテナが {timeout:?} 以内に準備完了になりませんでした")]
  ReadinessTimedOut {
    /// 設定されたタイムアウト
    timeout: Duration,
  },

  /// コンテナの停止に失敗
  #[error("コンテナ {container} の停止に失敗しました: {source}")]
  Stop {
    /// コンテナ名
    container: String,
    /// ランタイム側のエラー
    #[source]
    source: RuntimeError,
  },
}

/// 出力ストリームの解釈に関するエラー
///
/// プロセスが認識可能な回答をまったく返さなかったことを示す。
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum ProtocolError {
  /// 多重化ストリームの読み取りに失敗
  #[error("exec 出力ストリームの読み取りに失敗しました: {0}")]
  Demux(Arc<io::Error>),

  /// 出力に JSON 行が1行も無い
  #[error(
    "出力に有効な JSON 行が見つかりませんでした（初回プロビジョニング中の DNS 解決失敗など、\
     環境側の問題でアナライザーが構造化出力を返していない可能性があります）: {excerpt}"
  )]
  NoJsonFound {
    /// 出力の先頭部分
    excerpt: String,
  },
}

/// 応答 JSON 全体のデコードエラー（リクエストにとって致命的）
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum DecodeError {
  /// JSON として不正
  #[error("JSON のデコードに失敗しました: {source}: {excerpt}")]
  InvalidJson {
    /// 元となった JSON エラー
    #[source]
    source: Arc<serde_json::Error>,
    /// 入力の先頭部分
    excerpt: String,
  },

  /// トップレベルが配列ではない
  #[error("トップレベルは配列である必要があります: found={found}")]
  NotAnArray {
    /// 実際の JSON 型
    found: &'static str,
  },
}

/// 実行したコマンドの失敗
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum ExecutionError {
  /// 0 以外の終了コード
  #[error("コマンドが終了コード {exit_code} で失敗しました: {output}")]
  NonZeroExit {
    /// 終了コード
    exit_code: i64,
    /// 捕捉した出力（切り詰め済み）
    output: String,
  },

  /// 終了コードが報告されなかった
  #[error("exec {exec_id} の終了コードが取得できませんでした")]
  MissingExitCode {
    /// exec ID
    exec_id: String,
  },
}

/// エントリー単位のデコード問題
///
/// 呼び出し元には返さず、ログに記録した上で該当エントリーを読み飛ばす。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeWarning {
  /// 想定と異なる JSON 型
  #[error("{at}: {expected} を期待しましたが {found} でした")]
  UnexpectedType {
    /// 位置の説明
    at: &'static str,
    /// 期待した型
    expected: &'static str,
    /// 実際の型
    found: &'static str,
  },

  /// 配列の要素数が足りない
  #[error("{at}: 要素数が不足しています: len={len}, min={min}")]
  TooShort {
    /// 位置の説明
    at: &'static str,
    /// 実際の要素数
    len: usize,
    /// 必要な要素数
    min: usize,
  },

  /// トークンデータのデシリアライズに失敗
  #[error("トークンデータのデシリアライズに失敗しました: {reason}")]
  TokenData {
    /// 理由
    reason: String,
  },

  /// 代替解釈を1つも復元できなかった
  #[error("有効な代替解釈がありません: 候補数={candidates}")]
  NoAlternatives {
    /// 候補の数
    candidates: usize,
  },

  /// Unicode エスケープの復元に失敗
  #[error("{field} の Unicode エスケープ復元に失敗しました: {reason}")]
  Unescape {
    /// フィールド名
    field: &'static str,
    /// 理由
    reason: String,
  },

  /// 表層形が空
  #[error("表層形が空のトークンを破棄しました")]
  EmptySurface,

  /// 構成要素の連結が表層形と一致しない
  #[error("構成要素の連結 ({joined}) が表層形 ({surface}) と一致しないため破棄しました")]
  ComponentsMismatch {
    /// 親トークンの表層形
    surface: String,
    /// 構成要素の表層形の連結
    joined: String,
  },

  /// 漢字読みの取得・解釈に失敗
  #[error("{surface} の漢字読みを取得できませんでした: {reason}")]
  KanjiReadings {
    /// 対象トークンの表層形
    surface: String,
    /// 理由
    reason: String,
  },
}

/// 統合エラー
/// 本クレートの外部に公開するエラー用 API はこのエラーを返すこと
/// `FurikaeResult<T>` = `Result<T, FurikaeError>` として使用する
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum FurikaeError {
  /// 設定エラー
  #[error(transparent)]
  Config(#[from] ConfigError),

  /// 解析プロセスが利用できない
  #[error(transparent)]
  Provisioning(#[from] ProvisioningError),

  /// 出力ストリームから回答を取り出せない
  #[error(transparent)]
  Protocol(#[from] ProtocolError),

  /// 回答 JSON が不正
  #[error(transparent)]
  Decode(#[from] DecodeError),

  /// コマンドの実行失敗
  #[error(transparent)]
  Execution(#[from] ExecutionError),

  /// 呼び出し側のタイムアウトを超過
  #[error("{stage} が {timeout:?} 以内に完了しませんでした")]
  Timeout {
    /// タイムアウトした処理段階
    stage: &'static str,
    /// 設定されたタイムアウト
    timeout: Duration,
  },

  /// 入力テキストが不正
  #[error("入力テキストが不正です: {reason}")]
  InvalidInput {
    /// 不正の理由
    reason: String,
  },
}

impl FurikaeError {
  /// 解析プロセス自体が使えない種類のエラーかどうか
  ///
  /// `false` の場合はアナライザーが応答したものの形が想定外だったことを意味する。
  pub fn is_unavailable(&self) -> bool {
    matches!(self, FurikaeError::Provisioning(_) | FurikaeError::Timeout { .. })
  }
}

/// furikae クレートの標準 Result 型エイリアス
pub type FurikaeResult<T> = Result<T, FurikaeError>;

/// 文字列を `max` バイト以内に切り詰め、切り詰めた場合は `…` を付ける。
///
/// 文字境界で切るため、結果の本体は `max` バイト以下になる。
pub fn truncate_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut end = max;
  while !s.is_char_boundary(end) {
    end -= 1;
  }
  format!("{}…", &s[..end])
}
