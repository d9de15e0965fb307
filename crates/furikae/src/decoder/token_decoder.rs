//! Analyzer answer → TokenSequence
//!
//! The answer of `ichiran-cli -f` is a top-level array whose entries are either
//!
//! - a string: text passed through verbatim (punctuation, foreign text), or
//! - a segmentation group: `[[[entry, entry, …], score], …]`, where each entry is
//!   `[romanized, data, …]` and `data` is either a token object or a wrapper
//!   `{"alternative": [token object, …]}`.
//!
//! Each shape is matched in a fixed order. A mismatch inside one entry is logged and the
//! entry skipped; only an answer that is not a JSON array at all fails the request.

use std::sync::Arc;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};

use super::unescape::normalize_escapes;
use crate::errors::{DEFAULT_EXCERPT_BYTES, DecodeError, DecodeWarning, truncate_for_log};
use crate::models::{Conjugation, ConjugationProperty, Gloss, Token, TokenSequence};

/// Minimum length of a `[romanized, data, …]` entry.
const MIN_ENTRY_LEN: usize = 3;

// ===== Wire types =====

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// `readok` is not always a boolean.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
  D: Deserializer<'de>,
{
  Value::deserialize(deserializer).map(|v| v.as_bool().unwrap_or(false))
}

#[derive(Debug, Deserialize)]
struct WireToken {
  #[serde(default, deserialize_with = "nullable")]
  text: String,
  #[serde(default, deserialize_with = "nullable")]
  reading: String,
  #[serde(default, deserialize_with = "nullable")]
  kana: String,
  #[serde(default, deserialize_with = "nullable")]
  score: i64,
  #[serde(default, deserialize_with = "nullable")]
  seq: i64,
  #[serde(default, deserialize_with = "nullable")]
  gloss: Vec<WireGloss>,
  #[serde(default, deserialize_with = "nullable")]
  conj: Vec<WireConj>,
  #[serde(default, deserialize_with = "nullable")]
  compound: Vec<String>,
  #[serde(default, deserialize_with = "nullable")]
  components: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct WireGloss {
  #[serde(default, deserialize_with = "nullable")]
  pos: String,
  #[serde(default, deserialize_with = "nullable")]
  gloss: String,
  #[serde(default, deserialize_with = "nullable")]
  info: String,
}

#[derive(Debug, Deserialize)]
struct WireConj {
  #[serde(default, deserialize_with = "nullable")]
  prop: Vec<WireProp>,
  #[serde(default, deserialize_with = "nullable")]
  reading: String,
  #[serde(default, deserialize_with = "nullable")]
  gloss: Vec<WireGloss>,
  #[serde(default, deserialize_with = "lenient_bool")]
  readok: bool,
}

#[derive(Debug, Deserialize)]
struct WireProp {
  #[serde(default, deserialize_with = "nullable")]
  pos: String,
  #[serde(default, rename = "type", deserialize_with = "nullable")]
  kind: String,
  #[serde(default, deserialize_with = "lenient_bool")]
  neg: bool,
}

impl From<WireGloss> for Gloss {
  fn from(g: WireGloss) -> Self {
    Self {
      part_of_speech: g.pos,
      meaning: g.gloss,
      note: g.info,
    }
  }
}

impl From<WireConj> for Conjugation {
  fn from(c: WireConj) -> Self {
    Self {
      properties: c
        .prop
        .into_iter()
        .map(|p| ConjugationProperty {
          part_of_speech: p.pos,
          conjugation_type: p.kind,
          is_negative: p.neg,
        })
        .collect(),
      reading: c.reading,
      glosses: c.gloss.into_iter().map(Gloss::from).collect(),
      read_ok: c.readok,
    }
  }
}

// ===== Decoder =====

/// Decoded tokens plus the per-entry problems that were skipped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Decoded {
  /// Tokens in textual order
  pub tokens: TokenSequence,
  /// Skipped entries
  pub warnings: Vec<DecodeWarning>,
}

/// Decodes an extracted answer into tokens.
///
/// # Errors
/// The bytes are not JSON, or the top level is not an array.
pub fn decode(bytes: &[u8]) -> Result<TokenSequence, DecodeError> {
  decode_with_warnings(bytes).map(|decoded| decoded.tokens)
}

/// Same as [`decode`], also returning the skipped-entry warnings.
pub fn decode_with_warnings(bytes: &[u8]) -> Result<Decoded, DecodeError> {
  let root: Value = serde_json::from_slice(bytes).map_err(|e| DecodeError::InvalidJson {
    source: Arc::new(e),
    excerpt: truncate_for_log(&String::from_utf8_lossy(bytes), DEFAULT_EXCERPT_BYTES),
  })?;
  decode_value(&root)
}

/// Decodes an already parsed answer.
pub fn decode_value(root: &Value) -> Result<Decoded, DecodeError> {
  let entries = root.as_array().ok_or(DecodeError::NotAnArray {
    found: json_type(root),
  })?;

  let mut decoder = TokenDecoder::default();
  for entry in entries {
    decoder.top_level(entry);
  }
  Ok(decoder.finish())
}

/// JSON type name for diagnostics.
pub(crate) fn json_type(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "bool",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

#[derive(Debug, Default)]
struct TokenDecoder {
  tokens: Vec<Token>,
  warnings: Vec<DecodeWarning>,
}

impl TokenDecoder {
  fn finish(self) -> Decoded {
    Decoded {
      tokens: TokenSequence::new(self.tokens),
      warnings: self.warnings,
    }
  }

  fn warn(&mut self, warning: DecodeWarning) {
    warn!(warning = %warning, "skipping analyzer entry");
    self.warnings.push(warning);
  }

  fn top_level(&mut self, entry: &Value) {
    match entry {
      Value::String(raw) => self.passthrough(raw),
      Value::Array(group) => self.group(group),
      other => debug!(found = json_type(other), "ignoring top-level entry"),
    }
  }

  fn passthrough(&mut self, raw: &str) {
    let surface = match normalize_escapes(raw) {
      Ok(surface) => surface,
      Err(e) => {
        self.warn(DecodeWarning::Unescape {
          field: "passthrough",
          reason: e.to_string(),
        });
        raw.to_string()
      }
    };

    if surface.is_empty() {
      self.warn(DecodeWarning::EmptySurface);
      return;
    }
    self.tokens.push(Token::passthrough(surface));
  }

  /// `[[[entry, …], score], …]`: only the best segmentation (first layer) is read.
  fn group(&mut self, group: &[Value]) {
    let Some(layer) = self.expect_array(group.first(), "segmentation group") else {
      return;
    };
    let Some(entries) = self.expect_array(layer.first(), "segmentation") else {
      return;
    };

    for entry in entries {
      match entry {
        // Scores interleaved with the entries
        Value::Number(_) => continue,
        Value::Array(items) => {
          if let Some(token) = self.entry(items) {
            self.tokens.push(token);
          }
        }
        other => self.warn(DecodeWarning::UnexpectedType {
          at: "token entry",
          expected: "array",
          found: json_type(other),
        }),
      }
    }
  }

  fn expect_array<'v>(&mut self, value: Option<&'v Value>, at: &'static str) -> Option<&'v [Value]> {
    match value {
      Some(Value::Array(items)) => Some(items),
      Some(other) => {
        self.warn(DecodeWarning::UnexpectedType {
          at,
          expected: "array",
          found: json_type(other),
        });
        None
      }
      None => {
        self.warn(DecodeWarning::TooShort { at, len: 0, min: 1 });
        None
      }
    }
  }

  /// `[romanized, data, …]`
  fn entry(&mut self, items: &[Value]) -> Option<Token> {
    if items.len() < MIN_ENTRY_LEN {
      self.warn(DecodeWarning::TooShort {
        at: "token entry",
        len: items.len(),
        min: MIN_ENTRY_LEN,
      });
      return None;
    }

    let Some(romanized) = items[0].as_str() else {
      self.warn(DecodeWarning::UnexpectedType {
        at: "romanized form",
        expected: "string",
        found: json_type(&items[0]),
      });
      return None;
    };

    match self.token(&items[1], romanized) {
      Ok(token) => Some(token),
      Err(warning) => {
        self.warn(warning);
        None
      }
    }
  }

  /// Alternative wrapper or direct token object.
  fn token(&mut self, data: &Value, romanized: &str) -> Result<Token, DecodeWarning> {
    let Value::Object(object) = data else {
      return Err(DecodeWarning::UnexpectedType {
        at: "token data",
        expected: "object",
        found: json_type(data),
      });
    };

    match object.get("alternative") {
      Some(Value::Array(candidates)) => self.alternatives(candidates, romanized),
      Some(other) => Err(DecodeWarning::UnexpectedType {
        at: "alternative",
        expected: "array",
        found: json_type(other),
      }),
      None => self.direct(data, romanized),
    }
  }

  fn alternatives(&mut self, candidates: &[Value], romanized: &str) -> Result<Token, DecodeWarning> {
    let mut survivors = Vec::with_capacity(candidates.len());
    for candidate in candidates {
      match self.token(candidate, romanized) {
        Ok(token) => survivors.push(token),
        Err(warning) => self.warn(warning),
      }
    }

    Token::from_alternatives(survivors).ok_or(DecodeWarning::NoAlternatives {
      candidates: candidates.len(),
    })
  }

  fn direct(&mut self, data: &Value, romanized: &str) -> Result<Token, DecodeWarning> {
    let wire = WireToken::deserialize(data).map_err(|e| DecodeWarning::TokenData {
      reason: e.to_string(),
    })?;

    let surface = normalize_field("text", &wire.text)?;
    if surface.is_empty() {
      return Err(DecodeWarning::EmptySurface);
    }
    let reading = normalize_field("reading", &wire.reading)?;
    let kana = normalize_field("kana", &wire.kana)?;

    let components = self.components(&surface, &wire.components);

    Ok(Token {
      surface,
      is_lexical: true,
      reading,
      kana,
      romanized: romanized.to_string(),
      score: wire.score,
      sequence_id: wire.seq,
      glosses: wire.gloss.into_iter().map(Gloss::from).collect(),
      conjugations: wire.conj.into_iter().map(Conjugation::from).collect(),
      alternatives: Vec::new(),
      compound: wire.compound,
      components,
      kanji_readings: Vec::new(),
    })
  }

  /// Decodes compound components; keeps them only if they spell out `surface`.
  fn components(&mut self, surface: &str, raw: &[Value]) -> Vec<Token> {
    let mut components = Vec::with_capacity(raw.len());
    for value in raw {
      match self.token(value, "") {
        Ok(token) => components.push(token),
        Err(warning) => self.warn(warning),
      }
    }

    if components.is_empty() {
      return components;
    }

    let joined: String = components.iter().map(|c| c.surface.as_str()).collect();
    if joined != surface {
      self.warn(DecodeWarning::ComponentsMismatch {
        surface: surface.to_string(),
        joined,
      });
      return Vec::new();
    }
    components
  }
}

fn normalize_field(field: &'static str, raw: &str) -> Result<String, DecodeWarning> {
  normalize_escapes(raw).map_err(|e| DecodeWarning::Unescape {
    field,
    reason: e.to_string(),
  })
}

// ─────────────────────────────────────────────────────────────────────────────
// Test Module
// ─────────────────────────────────────────────────────────────────────────────
