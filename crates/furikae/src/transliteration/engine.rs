//! Selective transliteration
//!
//! Kanji that are frequent (rank within the threshold) and read regularly stay as they are;
//! every other kanji unit is replaced by its kana reading. Each unit produces one
//! [`ProcessingDecision`].

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::frequency::KanjiFrequency;
use crate::models::{
  KanjiReading, ProcessingDecision, ProcessingStatus, Token, TransliterationResult,
};

static KANJI: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\p{Han}").expect("static regex is valid"));

/// `text` contains at least one Han character.
pub fn contains_kanji(text: &str) -> bool {
  KANJI.is_match(text)
}

/// Applies the preservation policy against one frequency table.
#[derive(Debug, Clone, Copy)]
pub struct Transliterator<'a> {
  table: &'a KanjiFrequency,
}

impl<'a> Transliterator<'a> {
  /// Binds the table.
  pub fn new(table: &'a KanjiFrequency) -> Self {
    Self { table }
  }

  /// Rewrites `tokens`, keeping kanji whose rank is `<= threshold` and whose reading is regular.
  ///
  /// Token contributions are concatenated without separators.
  pub fn transliterate(&self, tokens: &[Token], threshold: usize) -> TransliterationResult {
    let mut result = TransliterationResult::default();
    for token in tokens {
      let contribution = self.token(token, threshold, &mut result.decisions);
      result.text.push_str(&contribution);
    }
    result
  }

  fn token(&self, token: &Token, threshold: usize, decisions: &mut Vec<ProcessingDecision>) -> String {
    if !token.is_lexical || !contains_kanji(&token.surface) {
      decisions.push(ProcessingDecision::unchanged(
        &token.surface,
        ProcessingStatus::PreservedNonKanji,
      ));
      return token.surface.clone();
    }

    if token.kanji_readings.is_empty() {
      decisions.push(ProcessingDecision::unchanged(
        &token.surface,
        ProcessingStatus::TransliteratedUnmappable,
      ));
      return token.surface.clone();
    }

    let mut out = String::new();
    let mut rest = token.surface.as_str();
    for reading in &token.kanji_readings {
      match rest.find(reading.kanji.as_str()).filter(|_| !reading.kanji.is_empty()) {
        Some(pos) => {
          gap(&rest[..pos], &mut out, decisions);
          rest = &rest[pos + reading.kanji.len()..];
        }
        None => {
          debug!(
            surface = %token.surface,
            kanji = %reading.kanji,
            "kanji reading not aligned with surface"
          );
        }
      }
      let decision = self.unit(reading, threshold);
      out.push_str(&decision.result);
      decisions.push(decision);
    }
    gap(rest, &mut out, decisions);

    if out.is_empty() {
      let fallback: String = token.kana_or_surface().split_whitespace().collect();
      decisions.push(ProcessingDecision::new(
        &token.surface,
        &fallback,
        ProcessingStatus::TransliteratedUnmappable,
      ));
      return fallback;
    }
    out
  }

  fn unit(&self, reading: &KanjiReading, threshold: usize) -> ProcessingDecision {
    let mut chars = reading.kanji.chars().peekable();
    let frequent = chars.peek().is_some()
      && chars.all(|c| self.table.rank(c).is_some_and(|rank| rank <= threshold));
    // Regularity is judged per character; a group only needs every character frequent.
    let regular = reading.is_group() || reading.is_regular();

    if frequent && regular {
      return ProcessingDecision::unchanged(&reading.kanji, ProcessingStatus::Preserved);
    }

    let status = if !frequent {
      ProcessingStatus::TransliteratedInfrequent
    } else {
      ProcessingStatus::TransliteratedIrregular
    };
    ProcessingDecision::new(&reading.kanji, &reading.reading, status)
  }
}

/// Surface text between aligned kanji units.
fn gap(text: &str, out: &mut String, decisions: &mut Vec<ProcessingDecision>) {
  if text.is_empty() {
    return;
  }
  let status = if contains_kanji(text) {
    ProcessingStatus::TransliteratedUnmappable
  } else {
    ProcessingStatus::PreservedNonKanji
  };
  out.push_str(text);
  decisions.push(ProcessingDecision::unchanged(text, status));
}
