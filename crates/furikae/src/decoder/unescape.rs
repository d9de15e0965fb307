//! Unicode escape normalization

/// Zero-width non-joiner left behind by the analyzer's JSON writer.
const ZWNJ: char = '\u{200C}';

fn strip_zwnj(s: &str) -> String {
  s.chars().filter(|&c| c != ZWNJ).collect()
}

/// Strips ZWNJ characters and resolves literal `\uXXXX` escapes.
///
/// Escapes are resolved through a JSON string round-trip, so other JSON escapes in the
/// same string are resolved too. Strings without `\u` are only stripped.
///
/// # Errors
/// A malformed escape sequence (e.g. `\u30`).
pub fn normalize_escapes(raw: &str) -> Result<String, serde_json::Error> {
  let stripped = strip_zwnj(raw);
  if !stripped.contains("\\u") {
    return Ok(stripped);
  }

  let quoted = format!("\"{}\"", stripped.replace('"', "\\\""));
  let decoded: String = serde_json::from_str(&quoted)?;
  Ok(strip_zwnj(&decoded))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn plain_text_is_unchanged() {
    assert_eq!(normalize_escapes("日本語").unwrap(), "日本語");
    assert_eq!(normalize_escapes("").unwrap(), "");
  }

  #[test]
  fn zwnj_is_always_stripped() {
    assert_eq!(normalize_escapes("に\u{200C}ほん").unwrap(), "にほん");
  }

  #[test]
  fn resolves_literal_escapes() {
    assert_eq!(normalize_escapes(r"\u65e5\u672c").unwrap(), "日本");
    assert_eq!(normalize_escapes(r"a\u3001b").unwrap(), "a、b");
  }

  #[test]
  fn escaped_zwnj_is_stripped_after_decoding() {
    assert_eq!(normalize_escapes(r"か\u200cな").unwrap(), "かな");
  }

  #[test]
  fn quotes_survive_round_trip() {
    assert_eq!(normalize_escapes(r#"\u3042""#).unwrap(), "あ\"");
  }

  #[test]
  fn malformed_escape_is_an_error() {
    assert!(normalize_escapes(r"\u30").is_err());
  }
}
