//! Response Model Definition

use serde::Serialize;

use furikae::{ContainerState, ProcessingDecision, Token, TokenSequence, TransliterationResult};

/// Analysis Response
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
  /// Tokens in input order
  pub tokens: Vec<TokenDto>,
  /// Surfaces joined by spaces
  pub tokenized: String,
  /// Kana rendering
  pub kana: String,
  /// Romanized rendering
  pub roman: String,
  /// Surfaces annotated with their glosses
  pub gloss: String,
  /// Elapsed time (milliseconds)
  pub elapsed_ms: u64,
}

impl AnalyzeResponse {
  /// Builds the response with every view of `tokens`.
  #[must_use]
  pub fn from_tokens(tokens: &TokenSequence, elapsed_ms: u64) -> Self {
    Self {
      tokens: tokens.iter().map(TokenDto::from).collect(),
      tokenized: tokens.tokenized(),
      kana: tokens.kana(),
      roman: tokens.roman(),
      gloss: tokens.gloss(),
      elapsed_ms,
    }
  }
}

/// Token Information (DTO)
///
/// Flattened view of [`Token`]; alternatives and components are summarized.
#[derive(Debug, Clone, Serialize)]
pub struct TokenDto {
  /// Surface form (string appearing in original text)
  pub surface: String,
  /// Dictionary word (false for punctuation and other passthrough text)
  pub is_lexical: bool,
  /// Kana reading
  #[serde(skip_serializing_if = "String::is_empty")]
  pub kana: String,
  /// Romanization
  #[serde(skip_serializing_if = "String::is_empty")]
  pub romanized: String,
  /// Meanings, conjugation glosses included
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub glosses: Vec<String>,
  /// Component surfaces of a compound
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub components: Vec<String>,
  /// Number of competing interpretations
  pub alternatives: usize,
}

impl From<&Token> for TokenDto {
  fn from(token: &Token) -> Self {
    Self {
      surface: token.surface.clone(),
      is_lexical: token.is_lexical,
      kana: token.kana.clone(),
      romanized: token.romanized.clone(),
      glosses: token.all_glosses().into_iter().map(str::to_string).collect(),
      components: token.components.iter().map(|c| c.surface.clone()).collect(),
      alternatives: token.alternatives.len(),
    }
  }
}

/// Transliteration Response
#[derive(Debug, Serialize)]
pub struct TransliterateResponse {
  /// Rewritten text
  pub text: String,
  /// One decision per emitted unit
  pub decisions: Vec<ProcessingDecision>,
  /// Elapsed time (milliseconds)
  pub elapsed_ms: u64,
}

impl TransliterateResponse {
  /// Wraps a library result.
  #[must_use]
  pub fn from_result(result: TransliterationResult, elapsed_ms: u64) -> Self {
    Self {
      text: result.text,
      decisions: result.decisions,
      elapsed_ms,
    }
  }
}

/// Analyzer container status
#[derive(Debug, Serialize)]
pub struct StatusResponse {
  /// Container name
  pub container: String,
  /// Docker state (`running`, `exited`, ...)
  pub state: ContainerState,
}
