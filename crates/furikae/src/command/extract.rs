//! Locates the answer line in noisy analyzer output

use serde::de::IgnoredAny;

use crate::errors::{DEFAULT_EXCERPT_BYTES, ProtocolError, truncate_for_log};

/// Returns the first line of `output` that is a JSON document.
///
/// Lines are trimmed and empty lines skipped. Per line:
/// 1. A fully quoted line (`"…"`, longer than 2 bytes) is decoded as a JSON string literal;
///    if its content is itself JSON, the content is returned.
/// 2. Otherwise a line starting with `[` or `{` is returned if it parses as JSON.
///
/// Build or runtime diagnostics around the answer are ignored.
///
/// # Errors
/// `ProtocolError::NoJsonFound` when no line qualifies.
pub fn extract_json(output: &[u8]) -> Result<Vec<u8>, ProtocolError> {
  for raw in output.split(|&b| b == b'\n') {
    let line = raw.trim_ascii();
    if line.is_empty() {
      continue;
    }

    if is_quoted(line) {
      if let Some(inner) = unquote_json(line) {
        return Ok(inner.into_bytes());
      }
      continue;
    }

    if matches!(line[0], b'[' | b'{') && serde_json::from_slice::<IgnoredAny>(line).is_ok() {
      return Ok(line.to_vec());
    }
  }

  Err(ProtocolError::NoJsonFound {
    excerpt: truncate_for_log(&String::from_utf8_lossy(output), DEFAULT_EXCERPT_BYTES),
  })
}

fn is_quoted(line: &[u8]) -> bool {
  line.len() > 2 && line[0] == b'"' && line[line.len() - 1] == b'"'
}

/// Decodes a JSON string literal whose content is itself a JSON document.
fn unquote_json(line: &[u8]) -> Option<String> {
  let inner: String = serde_json::from_slice(line).ok()?;
  serde_json::from_str::<IgnoredAny>(&inner).ok()?;
  Some(inner)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn returns_bare_json_line() {
    let out = extract_json(r#"[["watashi",{"text":"私"},[]]]"#.as_bytes()).unwrap();
    assert_eq!(out, r#"[["watashi",{"text":"私"},[]]]"#.as_bytes());
  }

  #[test]
  fn ignores_diagnostics_around_the_answer() {
    for before in 0..4 {
      for after in 0..4 {
        let mut text = String::new();
        for i in 0..before {
          text.push_str(&format!("; loading system {i}\n"));
        }
        text.push_str("  {\"ok\":true}  \n");
        for i in 0..after {
          text.push_str(&format!("WARNING: style {i}\n"));
        }

        let out = extract_json(text.as_bytes()).unwrap();
        assert_eq!(out, br#"{"ok":true}"#, "before={before}, after={after}");
      }
    }
  }

  #[test]
  fn unwraps_double_encoded_answer() {
    let text = "compiling...\n\"[{\\\"kanji\\\":\\\"日\\\"}]\"\n";
    let out = extract_json(text.as_bytes()).unwrap();
    assert_eq!(out, r#"[{"kanji":"日"}]"#.as_bytes());
  }

  #[test]
  fn skips_quoted_lines_that_are_not_json() {
    let text = "\"just a message\"\n[1,2]\n";
    let out = extract_json(text.as_bytes()).unwrap();
    assert_eq!(out, b"[1,2]");
  }

  #[test]
  fn skips_broken_bracket_lines() {
    let text = "[unterminated\n{\"a\":1}\n";
    let out = extract_json(text.as_bytes()).unwrap();
    assert_eq!(out, br#"{"a":1}"#);
  }

  #[test]
  fn short_quoted_line_is_not_unwrapped() {
    let err = extract_json(b"\"\"\n").unwrap_err();
    assert!(matches!(err, ProtocolError::NoJsonFound { .. }));
  }

  #[test]
  fn reports_excerpt_when_nothing_qualifies() {
    let text = "Temporary failure in name resolution\nquicklisp: retrying\n";
    let err = extract_json(text.as_bytes()).unwrap_err();
    match err {
      ProtocolError::NoJsonFound { excerpt } => {
        assert!(excerpt.starts_with("Temporary failure"));
      }
      other => panic!("unexpected error: {other:?}"),
    }
  }
}
