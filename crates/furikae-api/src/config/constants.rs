//! API設定の定数定義

/// 入力テキストの最大長（バイト単位）
///
/// アナライザーは 1 リクエストごとにコンテナ内でプロセスを起動するため、
/// 長いテキストは数分単位の処理時間になる。
pub const MAX_TEXT_LENGTH: usize = 100_000;

/// デフォルトのバインドアドレス
///
/// 開発環境での利用を想定した localhost の標準ポート。
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5530";

/// バインドアドレスの環境変数名
pub const ENV_BIND_ADDR: &str = "FURIKAE_API_BIND_ADDR";

/// Docker Engine API の URL の環境変数名
pub const ENV_DOCKER_HOST: &str = "FURIKAE_DOCKER_HOST";

/// 解析コンテナ名の環境変数名
pub const ENV_CONTAINER: &str = "FURIKAE_CONTAINER";

/// 解析タイムアウト（秒）の環境変数名
pub const ENV_QUERY_TIMEOUT_SECS: &str = "FURIKAE_QUERY_TIMEOUT_SECS";

/// 漢字頻度表ファイルの環境変数名
pub const ENV_FREQUENCY_TABLE: &str = "FURIKAE_FREQUENCY_TABLE";
