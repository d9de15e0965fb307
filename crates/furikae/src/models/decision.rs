//! Transliteration decisions

use std::fmt;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Outcome for one kanji unit or one non-kanji span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
  /// Kept as kanji: frequent and regular reading
  Preserved,
  /// Replaced by kana: irregular reading
  TransliteratedIrregular,
  /// Replaced by kana: rank missing or above the threshold
  TransliteratedInfrequent,
  /// Could not be evaluated
  TransliteratedUnmappable,
  /// Contains no kanji
  PreservedNonKanji,
}

impl ProcessingStatus {
  /// The output keeps the original text.
  pub fn is_preserved(&self) -> bool {
    matches!(self, ProcessingStatus::Preserved)
  }
}

impl fmt::Display for ProcessingStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      ProcessingStatus::Preserved => "Preserved (regular reading & frequent)",
      ProcessingStatus::TransliteratedIrregular => "Transliterated (irregular reading)",
      ProcessingStatus::TransliteratedInfrequent => "Transliterated (infrequent)",
      ProcessingStatus::TransliteratedUnmappable => "Transliterated (unmappable)",
      ProcessingStatus::PreservedNonKanji => "Preserved (not kanji)",
    };
    f.write_str(s)
  }
}

/// One entry of the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingDecision {
  /// Input text of the unit
  pub original: String,
  /// Emitted text
  pub result: String,
  /// Why
  pub status: ProcessingStatus,
}

impl ProcessingDecision {
  /// Builds a decision.
  pub fn new(original: impl Into<String>, result: impl Into<String>, status: ProcessingStatus) -> Self {
    Self {
      original: original.into(),
      result: result.into(),
      status,
    }
  }

  /// Unit emitted unchanged with `status`.
  pub fn unchanged(text: impl Into<String>, status: ProcessingStatus) -> Self {
    let text = text.into();
    Self {
      result: text.clone(),
      original: text,
      status,
    }
  }
}

/// Rewritten text plus the decisions that produced it, in processing order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransliterationResult {
  /// Final text
  pub text: String,
  /// Audit trail
  pub decisions: Vec<ProcessingDecision>,
}

impl TransliterationResult {
  /// Number of decisions with `status`.
  pub fn count(&self, status: ProcessingStatus) -> usize {
    self.decisions.iter().filter(|d| d.status == status).count()
  }

  /// Human-readable audit trail.
  pub fn details(&self) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Final text: {}", self.text);
    let _ = writeln!(out);
    let _ = writeln!(out, "Processing details:");
    for decision in &self.decisions {
      let _ = writeln!(out, "\tOriginal: {}", decision.original);
      let _ = writeln!(out, "\tResult:   {}", decision.result);
      let _ = writeln!(out, "\tStatus:   {}", decision.status);
      let _ = writeln!(out, "------------------");
    }
    out
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_display_strings() {
    assert_eq!(
      ProcessingStatus::Preserved.to_string(),
      "Preserved (regular reading & frequent)"
    );
    assert_eq!(
      ProcessingStatus::TransliteratedIrregular.to_string(),
      "Transliterated (irregular reading)"
    );
    assert_eq!(
      ProcessingStatus::PreservedNonKanji.to_string(),
      "Preserved (not kanji)"
    );
  }

  #[test]
  fn details_lists_every_decision() {
    let result = TransliterationResult {
      text: "にほん語".to_string(),
      decisions: vec![
        ProcessingDecision::new("日本", "にほん", ProcessingStatus::TransliteratedInfrequent),
        ProcessingDecision::unchanged("語", ProcessingStatus::Preserved),
      ],
    };

    let details = result.details();
    assert!(details.starts_with("Final text: にほん語\n"));
    assert!(details.contains("\tOriginal: 日本\n\tResult:   にほん\n\tStatus:   Transliterated (infrequent)\n"));
    assert_eq!(details.matches("------------------").count(), 2);
    assert_eq!(result.count(ProcessingStatus::Preserved), 1);
  }

  #[test]
  fn status_serializes_snake_case() {
    let json = serde_json::to_string(&ProcessingStatus::TransliteratedUnmappable).unwrap();
    assert_eq!(json, "\"transliterated_unmappable\"");
  }
}
