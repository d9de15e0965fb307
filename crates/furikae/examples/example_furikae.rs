//! furikae crate example
//!
//! Analyzes a sentence in a running ichiran container (Docker Engine API on
//! `http://127.0.0.1:2375`) and prints the derived views and a selective transliteration.
//!
//! ```text
//! cargo run --example example_furikae -- "私は日本語を勉強しています。" 500
//! ```

use furikae::{Furikae, FurikaeConfig};
use tracing_subscriber::EnvFilter;

/// Application common result type
type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> AppResult<()> {
  // Use RUST_LOG environment variable if set
  // Default: info for global, debug for furikae
  let env_filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,furikae=debug"));
  tracing_subscriber::fmt().with_env_filter(env_filter).with_target(true).with_level(true).init();

  let mut args = std::env::args().skip(1);
  let text = args.next().unwrap_or_else(|| "私は日本語を勉強しています。".to_string());
  let threshold = args.next().map(|s| s.parse::<usize>()).transpose()?;

  let furikae = Furikae::new(FurikaeConfig::default())?;

  // 1. Bring up the analyzer (first run builds the image and may take a long time)
  furikae.init().await?;

  // 2. Analyze
  let tokens = furikae.analyze(&text).await?;
  println!("Tokenized: {}", tokens.tokenized());
  println!("Kana:      {}", tokens.kana());
  println!("Roman:     {}", tokens.roman());
  println!("Gloss:     {}", tokens.gloss());
  println!();

  // 3. Selective transliteration
  let result = furikae.transliterate(&tokens, threshold)?;
  print!("{}", result.details());

  Ok(())
}
