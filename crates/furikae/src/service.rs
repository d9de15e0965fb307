// crates/furikae/src/service.rs

//! Furikae: furikae クレートの統合ファサード。
//!
//! - コンテナランタイム (ContainerRuntime) - 解析コンテナへのハンドル
//! - 起動待ち (ReadinessController) - 初回利用時に一度だけ実行
//! - コマンド実行 (CommandRunner) → 出力抽出 → トークンデコード
//! - 選択的かな書き換え (Transliterator) - 漢字頻度表を遅延ロード
//!
//! 呼び出し側はこの構造体だけを意識すればよい。
//! プロセス全体で 1 つのハンドルを共有したい場合は [`default_instance`] を使う。

use std::sync::{Arc, Mutex, OnceLock};

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::command::{CommandRunner, analysis_command, extract_json, kanji_readings_command};
use crate::config::FurikaeConfig;
use crate::decoder::{Decoded, decode_with_warnings, parse_kanji_readings};
use crate::errors::{
  ConfigError, DecodeWarning, FurikaeError, FurikaeResult, ProvisioningError,
};
use crate::models::{KanjiReading, Token, TokenSequence, TransliterationResult};
use crate::readiness::{BringUp, ReadinessController};
use crate::runtime::{ContainerRuntime, ContainerState, DockerRuntime};
use crate::transliteration::{KanjiFrequency, Transliterator, contains_kanji};

/// furikae クレートの統合ファサード。
///
/// 1 つのハンドルを複数のリクエストから同時に使ってよい。
/// リクエストごとに独立した exec ユニットが作られるため、リクエスト同士は直列化されない。
pub struct Furikae {
  /// 設定（検証済み）
  config: FurikaeConfig,

  /// 解析コンテナ
  runtime: Arc<dyn ContainerRuntime>,

  /// exec 実行
  runner: CommandRunner,

  /// 起動結果。失敗も含めてこのハンドルでは確定とする
  readiness: OnceCell<Result<(), ProvisioningError>>,

  /// 漢字頻度表（初回利用時にロード、エラーもキャッシュ）
  frequency: OnceLock<Result<Arc<KanjiFrequency>, ConfigError>>,
}

impl std::fmt::Debug for Furikae {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Furikae")
      .field("container", &self.runtime.name())
      .field("initialized", &self.readiness.initialized())
      .finish()
  }
}

impl Furikae {
  /// Docker Engine API に接続するハンドルを作成する。
  ///
  /// コンテナの起動はここでは行わない（[`Furikae::init`] または初回の解析時に行う）。
  ///
  /// # エラー
  /// - 設定が不正
  /// - HTTP クライアントの構築に失敗
  pub fn new(config: FurikaeConfig) -> FurikaeResult<Self> {
    config.validate()?;
    let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerRuntime::new(&config)?);
    Ok(Self::build(config, runtime))
  }

  /// 任意のランタイムでハンドルを作成する（テスト用スクリプトランタイム等）。
  pub fn with_runtime(config: FurikaeConfig, runtime: Arc<dyn ContainerRuntime>) -> FurikaeResult<Self> {
    config.validate()?;
    Ok(Self::build(config, runtime))
  }

  fn build(config: FurikaeConfig, runtime: Arc<dyn ContainerRuntime>) -> Self {
    Self {
      config,
      runner: CommandRunner::new(Arc::clone(&runtime)),
      runtime,
      readiness: OnceCell::new(),
      frequency: OnceLock::new(),
    }
  }

  /// 設定
  pub fn config(&self) -> &FurikaeConfig {
    &self.config
  }

  /// コンテナを起動し、解析可能になるまで待つ。
  ///
  /// - 2 回目以降は最初の結果をそのまま返す
  /// - 同時に呼ばれた場合も起動処理は 1 回だけ実行され、他の呼び出しはその結果を待つ
  pub async fn init(&self) -> FurikaeResult<()> {
    self
      .readiness
      .get_or_init(|| self.bring_up())
      .await
      .clone()
      .map_err(FurikaeError::from)
  }

  async fn bring_up(&self) -> Result<(), ProvisioningError> {
    let timeout = self.config.ready_timeout();
    let controller = ReadinessController::new(Arc::clone(&self.runtime), self.config.ready_sentinel());
    match controller.bring_up(timeout).await {
      BringUp::Ready => Ok(()),
      BringUp::Failed(reason) => Err(ProvisioningError::NotReady { reason }),
      BringUp::TimedOut => Err(ProvisioningError::ReadinessTimedOut { timeout }),
    }
  }

  /// テキストを解析してトークン列を返す。
  ///
  /// # エラー
  /// - 空のテキスト: `InvalidInput`
  /// - コンテナが使えない: `Provisioning`
  /// - 出力に JSON がない: `Protocol`
  /// - JSON 全体が不正: `Decode`
  /// - コマンドの異常終了: `Execution`
  /// - `timeouts.query_secs` 超過: `Timeout`
  pub async fn analyze(&self, text: &str) -> FurikaeResult<TokenSequence> {
    self.analyze_with_warnings(text).await.map(|decoded| decoded.tokens)
  }

  /// [`Furikae::analyze`] と同じ。スキップしたエントリーの警告も返す。
  pub async fn analyze_with_warnings(&self, text: &str) -> FurikaeResult<Decoded> {
    if text.trim().is_empty() {
      return Err(FurikaeError::InvalidInput {
        reason: "text is empty".to_string(),
      });
    }

    self.init().await?;

    let timeout = self.config.query_timeout();
    tokio::time::timeout(timeout, self.pipeline(text))
      .await
      .map_err(|_| FurikaeError::Timeout {
        stage: "analyze",
        timeout,
      })?
  }

  /// exec → 抽出 → デコード → 漢字読みの付与（直列）
  async fn pipeline(&self, text: &str) -> FurikaeResult<Decoded> {
    let output = self.runner.run(&analysis_command(text)).await?;
    let json = extract_json(&output.output)?;
    let decoded = decode_with_warnings(&json)?;

    if !self.config.fetch_kanji_readings() {
      return Ok(decoded);
    }

    let Decoded {
      tokens,
      mut warnings,
    } = decoded;
    let mut tokens = tokens.into_inner();
    for token in tokens
      .iter_mut()
      .filter(|t| t.is_lexical && contains_kanji(&t.surface))
    {
      match self.kanji_readings(token).await {
        Ok(readings) => token.kanji_readings = readings,
        Err(reason) => {
          let warning = DecodeWarning::KanjiReadings {
            surface: token.surface.clone(),
            reason,
          };
          warn!(warning = %warning, "continuing without kanji readings");
          warnings.push(warning);
        }
      }
    }

    debug!(tokens = tokens.len(), warnings = warnings.len(), "analysis decoded");
    Ok(Decoded {
      tokens: TokenSequence::new(tokens),
      warnings,
    })
  }

  /// 2 回目の呼び出し: トークン単位の漢字読み対応
  async fn kanji_readings(&self, token: &Token) -> Result<Vec<KanjiReading>, String> {
    if token.kana.trim().is_empty() {
      return Err("token has no kana reading".to_string());
    }
    let output = self
      .runner
      .run(&kanji_readings_command(&token.surface, &token.kana))
      .await
      .map_err(|e| e.to_string())?;
    let json = extract_json(&output.output).map_err(|e| e.to_string())?;
    parse_kanji_readings(&json).map_err(|e| e.to_string())
  }

  /// 漢字頻度表を返す（初回のみロード）。
  ///
  /// ロードに失敗した場合はエラーをキャッシュし、以降も同じエラーを返し続ける。
  pub fn frequency_table(&self) -> FurikaeResult<Arc<KanjiFrequency>> {
    self
      .frequency
      .get_or_init(|| KanjiFrequency::resolve(self.config.frequency_table_path()).map(Arc::new))
      .clone()
      .map_err(FurikaeError::from)
  }

  /// 選択的かな書き換え
  ///
  /// `threshold` が `None` の場合は `transliteration.default_threshold` を使う。
  pub fn transliterate(
    &self,
    tokens: &[Token],
    threshold: Option<usize>,
  ) -> FurikaeResult<TransliterationResult> {
    let table = self.frequency_table()?;
    let threshold = threshold.unwrap_or(self.config.default_threshold());
    Ok(Transliterator::new(&table).transliterate(tokens, threshold))
  }

  /// 解析してからかな書き換えを行う。
  pub async fn analyze_and_transliterate(
    &self,
    text: &str,
    threshold: Option<usize>,
  ) -> FurikaeResult<TransliterationResult> {
    let tokens = self.analyze(text).await?;
    self.transliterate(&tokens, threshold)
  }

  /// 解析コンテナの現在の状態
  pub async fn status(&self) -> FurikaeResult<ContainerState> {
    let info = self
      .runtime
      .inspect()
      .await
      .map_err(|source| ProvisioningError::Inspect {
        container: self.runtime.name().to_string(),
        source,
      })?;
    Ok(info.state)
  }

  /// 解析コンテナを停止する。
  pub async fn stop(&self) -> FurikaeResult<()> {
    self.runtime.stop().await.map_err(|source| ProvisioningError::Stop {
      container: self.runtime.name().to_string(),
      source,
    })?;
    Ok(())
  }
}

// ===== デフォルトインスタンス =====

static DEFAULT_INSTANCE: Mutex<Option<Arc<Furikae>>> = Mutex::new(None);

/// プロセス共有のハンドルを返す（なければ `config` で作成）。
///
/// 既に作成済みの場合 `config` は使われない。
pub fn default_instance(config: &FurikaeConfig) -> FurikaeResult<Arc<Furikae>> {
  let mut slot = DEFAULT_INSTANCE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
  if let Some(existing) = slot.as_ref() {
    return Ok(Arc::clone(existing));
  }

  let created = Arc::new(Furikae::new(config.clone())?);
  info!(container = %config.container_name(), "default furikae instance created");
  *slot = Some(Arc::clone(&created));
  Ok(created)
}

/// 共有ハンドルを破棄し、コンテナを停止する。
///
/// 停止に失敗してもハンドルは破棄され、次の [`default_instance`] で作り直される。
pub async fn close_default() -> FurikaeResult<()> {
  let taken = DEFAULT_INSTANCE
    .lock()
    .unwrap_or_else(|poisoned| poisoned.into_inner())
    .take();
  match taken {
    Some(instance) => instance.stop().await,
    None => Ok(()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::DEFAULT_READY_SENTINEL;
  use crate::runtime::{ScriptedExec, ScriptedRuntime};
  use std::time::Duration;

  // ─── ヘルパー ───

  const ANALYSIS: &str = r#"[[[[["nihongo",{"text":"日本語","kana":"にほんご","score":100,"seq":1,"gloss":[{"pos":"[n]","gloss":"Japanese language"}]},[]]],100]],"。"]"#;

  const READINGS: &str = r#""[{\"kanji\":\"日\",\"reading\":\"に\",\"type\":\"ja_on\",\"link\":true,\"geminated\":\"\"},{\"kanji\":\"本\",\"reading\":\"ほん\",\"type\":\"ja_on\",\"link\":true,\"geminated\":\"\"},{\"kanji\":\"語\",\"reading\":\"ご\",\"type\":\"ja_on\",\"link\":true,\"geminated\":\"\"}]""#;

  fn ready_runtime() -> ScriptedRuntime {
    ScriptedRuntime::new("ichiran-main-1")
      .with_log_line(DEFAULT_READY_SENTINEL)
      .with_exec(" -f ", ScriptedExec::stdout(ANALYSIS))
      .with_exec("match-readings-json", ScriptedExec::stdout(READINGS))
  }

  fn service(runtime: ScriptedRuntime) -> (Furikae, Arc<ScriptedRuntime>) {
    let runtime = Arc::new(runtime);
    let furikae = Furikae::with_runtime(FurikaeConfig::default(), runtime.clone()).unwrap();
    (furikae, runtime)
  }

  // ─── analyze ───

  #[tokio::test]
  async fn analyze_runs_the_whole_pipeline() {
    let (furikae, runtime) = service(ready_runtime());
    let tokens = furikae.analyze("日本語。").await.unwrap();

    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0].surface, "日本語");
    assert!(tokens[0].is_lexical);
    assert_eq!(tokens[0].kanji_readings.len(), 3);
    assert!(!tokens[1].is_lexical);
    assert_eq!(runtime.executed().len(), 2);
  }

  #[tokio::test]
  async fn empty_text_is_rejected_before_bring_up() {
    let (furikae, runtime) = service(ready_runtime());
    let err = furikae.analyze("  ").await.unwrap_err();
    assert!(matches!(err, FurikaeError::InvalidInput { .. }));
    assert_eq!(runtime.start_calls(), 0);
  }

  #[tokio::test]
  async fn bring_up_happens_once() {
    let (furikae, runtime) = service(ready_runtime());
    let furikae = Arc::new(furikae);

    let calls: Vec<_> = (0..4)
      .map(|_| {
        let furikae = Arc::clone(&furikae);
        tokio::spawn(async move { furikae.analyze("日本語。").await })
      })
      .collect();
    for call in calls {
      assert!(call.await.unwrap().is_ok());
    }
    assert_eq!(runtime.start_calls(), 1);
  }

  #[tokio::test]
  async fn kanji_reading_failure_is_a_warning() {
    let runtime = ScriptedRuntime::new("ichiran-main-1")
      .with_log_line(DEFAULT_READY_SENTINEL)
      .with_exec(" -f ", ScriptedExec::stdout(ANALYSIS))
      .with_exec(
        "match-readings-json",
        ScriptedExec::stdout("debugger invoked").with_exit_code(Some(1)),
      );
    let (furikae, _) = service(runtime);

    let decoded = furikae.analyze_with_warnings("日本語。").await.unwrap();
    assert!(decoded.tokens[0].kanji_readings.is_empty());
    assert!(
      decoded
        .warnings
        .iter()
        .any(|w| matches!(w, DecodeWarning::KanjiReadings { surface, .. } if surface == "日本語"))
    );
  }

  #[tokio::test]
  async fn slow_query_times_out() {
    let mut config = FurikaeConfig::default();
    config.timeouts.query_secs = 1;
    let runtime = Arc::new(ready_runtime().with_exec_delay(Duration::from_secs(3)));
    let furikae = Furikae::with_runtime(config, runtime).unwrap();

    let err = furikae.analyze("日本語。").await.unwrap_err();
    assert!(matches!(err, FurikaeError::Timeout { stage: "analyze", .. }));
  }

  #[tokio::test]
  async fn failed_bring_up_is_cached() {
    let runtime = ScriptedRuntime::new("ichiran-main-1").with_start_failure("compose file missing");
    let (furikae, runtime) = service(runtime);

    for _ in 0..2 {
      let err = furikae.analyze("日本語").await.unwrap_err();
      assert!(matches!(
        err,
        FurikaeError::Provisioning(ProvisioningError::NotReady { .. })
      ));
    }
    assert_eq!(runtime.start_calls(), 1);
  }

  // ─── transliterate ───

  #[tokio::test]
  async fn analyze_and_transliterate_uses_readings() {
    let (furikae, _) = service(ready_runtime());

    let everything = furikae.analyze_and_transliterate("日本語。", Some(0)).await.unwrap();
    assert_eq!(everything.text, "にほんご。");

    let table = furikae.frequency_table().unwrap();
    let nothing = furikae
      .analyze_and_transliterate("日本語。", Some(table.len()))
      .await
      .unwrap();
    assert_eq!(nothing.text, "日本語。");
  }

  #[test]
  fn frequency_table_error_is_cached() {
    let mut config = FurikaeConfig::default();
    let furikae = Furikae::with_runtime(config.clone(), Arc::new(ScriptedRuntime::new("x"))).unwrap();
    assert!(furikae.frequency_table().is_ok());

    // An empty table file passes validation but cannot be loaded.
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("freq.txt");
    std::fs::write(&path, "").unwrap();
    config.transliteration.frequency_table = Some(path);
    let furikae = Furikae::with_runtime(config, Arc::new(ScriptedRuntime::new("x"))).unwrap();

    let first = furikae.frequency_table().unwrap_err();
    let second = furikae.frequency_table().unwrap_err();
    assert_eq!(first.to_string(), second.to_string());
  }

  // ─── status / stop ───

  #[tokio::test]
  async fn status_and_stop() {
    let (furikae, runtime) = service(ready_runtime());
    assert_eq!(furikae.status().await.unwrap(), ContainerState::Running);

    furikae.stop().await.unwrap();
    assert_eq!(furikae.status().await.unwrap(), ContainerState::Exited);
    assert_eq!(runtime.stop_calls(), 1);
  }

  #[tokio::test]
  async fn queries_after_stop_fail_as_provisioning() {
    let (furikae, runtime) = service(ready_runtime());
    furikae.analyze("日本語。").await.unwrap();
    runtime.set_state(ContainerState::Exited);

    let err = furikae.analyze("日本語。").await.unwrap_err();
    assert!(err.is_unavailable());
    assert!(matches!(
      err,
      FurikaeError::Provisioning(ProvisioningError::NotRunning { .. })
    ));
  }

  // ─── デフォルトインスタンス ───

  #[tokio::test]
  async fn default_instance_is_shared_and_recreated_after_close() {
    let mut config = FurikaeConfig::default();
    // Nothing listens on the discard port; stop fails fast.
    config.container.docker_host = "http://127.0.0.1:9".to_string();

    let first = default_instance(&config).unwrap();
    let again = default_instance(&config).unwrap();
    assert!(Arc::ptr_eq(&first, &again));

    let _ = close_default().await;
    let recreated = default_instance(&config).unwrap();
    assert!(!Arc::ptr_eq(&first, &recreated));

    let _ = close_default().await;
  }

  #[test]
  fn debug_shows_container() {
    let (furikae, _) = service(ready_runtime());
    let shown = format!("{furikae:?}");
    assert!(shown.contains("ichiran-main-1"));
    assert!(shown.contains("initialized: false"));
  }
}
