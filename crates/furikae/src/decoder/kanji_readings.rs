//! Kanji-level reading match (`match-readings-json`)
//!
//! The answer is an array mixing kanji entries and plain text entries:
//!
//! ```text
//! [{"kanji":"日","reading":"に","type":"ja_on","link":false,"geminated":"",…}, {"text":"は"}, …]
//! ```
//!
//! Text entries (kana between or after kanji) carry no reading and are skipped.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::token_decoder::json_type;
use super::unescape::normalize_escapes;
use crate::errors::{DEFAULT_EXCERPT_BYTES, DecodeError, truncate_for_log};
use crate::models::KanjiReading;

#[derive(Debug, Deserialize)]
struct WireKanjiReading {
  kanji: String,
  #[serde(default)]
  reading: Option<String>,
  #[serde(default, rename = "type")]
  kind: Option<String>,
  #[serde(default)]
  link: Value,
  #[serde(default)]
  geminated: Value,
}

/// Parses an extracted `match-readings-json` answer.
///
/// # Errors
/// The bytes are not JSON, or the top level is not an array.
pub fn parse_kanji_readings(bytes: &[u8]) -> Result<Vec<KanjiReading>, DecodeError> {
  let root: Value = serde_json::from_slice(bytes).map_err(|e| DecodeError::InvalidJson {
    source: Arc::new(e),
    excerpt: truncate_for_log(&String::from_utf8_lossy(bytes), DEFAULT_EXCERPT_BYTES),
  })?;
  let entries = root.as_array().ok_or(DecodeError::NotAnArray {
    found: json_type(&root),
  })?;

  Ok(entries.iter().filter_map(kanji_entry).collect())
}

fn kanji_entry(entry: &Value) -> Option<KanjiReading> {
  if entry.get("kanji").is_none() {
    return None;
  }

  let wire = match WireKanjiReading::deserialize(entry) {
    Ok(wire) => wire,
    Err(e) => {
      debug!(error = %e, "skipping kanji reading entry");
      return None;
    }
  };

  Some(KanjiReading {
    kanji: unescape_or_keep(&wire.kanji),
    reading: unescape_or_keep(wire.reading.as_deref().unwrap_or_default()),
    kind: wire.kind.unwrap_or_default(),
    is_linked: wire.link.as_bool().unwrap_or(false),
    geminated: wire.geminated.as_str().map(unescape_or_keep).unwrap_or_default(),
  })
}

fn unescape_or_keep(raw: &str) -> String {
  normalize_escapes(raw).unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn keeps_kanji_entries_in_order() {
    let bytes = r#"[
      {"kanji":"日","reading":"に","type":"ja_on","link":false,"geminated":"","stats":true},
      {"kanji":"本","reading":"ほん","type":"ja_on","link":true,"geminated":""},
      {"text":"は"}
    ]"#.as_bytes();
    let readings = parse_kanji_readings(bytes).unwrap();

    assert_eq!(readings.len(), 2);
    assert_eq!(readings[0].kanji, "日");
    assert_eq!(readings[0].kind, "ja_on");
    assert!(!readings[0].is_linked);
    assert!(readings[1].is_regular());
  }

  #[test]
  fn tolerates_non_string_gemination() {
    let bytes = r#"[{"kanji":"学","reading":"がっ","link":true,"geminated":null},
                     {"kanji":"校","reading":"こう","link":true,"geminated":"っ"}]"#.as_bytes();
    let readings = parse_kanji_readings(bytes).unwrap();
    assert_eq!(readings[0].geminated, "");
    assert_eq!(readings[1].geminated, "っ");
    assert!(!readings[1].is_regular());
  }

  #[test]
  fn multi_character_groups_are_kept_whole() {
    let readings = parse_kanji_readings(r#"[{"kanji":"今日","reading":"きょう","link":true}]"#.as_bytes()).unwrap();
    assert!(readings[0].is_group());
    assert_eq!(readings[0].reading, "きょう");
  }

  #[test]
  fn rejects_non_array() {
    assert!(matches!(
      parse_kanji_readings(br#""[]""#),
      Err(DecodeError::NotAnArray { found: "string" })
    ));
    assert!(matches!(
      parse_kanji_readings(b"nope"),
      Err(DecodeError::InvalidJson { .. })
    ));
  }
}
