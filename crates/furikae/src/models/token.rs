//! Token model and derived views

use std::ops::Deref;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Two or more consecutive ASCII whitespace characters.
static MULTI_SPACE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"[\t\n\x0C\r ]{2,}").expect("static regex is valid"));

/// Separator substituted for runs of whitespace in joined views.
const RUN_SEPARATOR: &str = ", ";

/// Dictionary meaning attached to a token or a conjugated form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Gloss {
  /// Part of speech (e.g. "[n]")
  pub part_of_speech: String,
  /// English meaning
  pub meaning: String,
  /// Additional information
  pub note: String,
}

/// Grammatical property of a conjugation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConjugationProperty {
  /// Part of speech
  pub part_of_speech: String,
  /// Conjugation type (e.g. "Continuative (~i)")
  pub conjugation_type: String,
  /// Negative form
  pub is_negative: bool,
}

/// Conjugation record. Carries the meaning of the base form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Conjugation {
  /// Grammatical properties
  pub properties: Vec<ConjugationProperty>,
  /// Base form reading
  pub reading: String,
  /// Base form meanings
  pub glosses: Vec<Gloss>,
  /// Whether the analyzer accepted the reading
  pub read_ok: bool,
}

/// How one kanji (or an undecomposable kanji group) maps to part of the kana reading.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KanjiReading {
  /// Kanji character; more than one character means an atomic group
  pub kanji: String,
  /// Kana reading of this unit
  pub reading: String,
  /// Reading kind reported by the analyzer (e.g. "ja_on", "ja_kun")
  pub kind: String,
  /// Reading links directly to its kana span
  pub is_linked: bool,
  /// Gemination mark (e.g. "っ"); empty when none
  pub geminated: String,
}

impl KanjiReading {
  /// Linked and without gemination.
  pub fn is_regular(&self) -> bool {
    self.is_linked && self.geminated.is_empty()
  }

  /// The kanji unit spans more than one character.
  pub fn is_group(&self) -> bool {
    self.kanji.chars().nth(1).is_some()
  }
}

/// Unit of analysis output.
///
/// Created once while decoding a response and not modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Token {
  /// Original text segment (never empty)
  pub surface: String,
  /// Analyzed as language content (false = passed through verbatim)
  pub is_lexical: bool,
  /// Reading with kanji and kana
  #[serde(default)]
  pub reading: String,
  /// Kana reading
  #[serde(default)]
  pub kana: String,
  /// Romanized form
  #[serde(default)]
  pub romanized: String,
  /// Analyzer score
  #[serde(default)]
  pub score: i64,
  /// Dictionary sequence number
  #[serde(default)]
  pub sequence_id: i64,
  /// Meanings
  #[serde(default)]
  pub glosses: Vec<Gloss>,
  /// Conjugations
  #[serde(default)]
  pub conjugations: Vec<Conjugation>,
  /// Alternative interpretations of the same span
  #[serde(default)]
  pub alternatives: Vec<Token>,
  /// Surfaces of the compound's elements
  #[serde(default)]
  pub compound: Vec<String>,
  /// Constituent morphemes of a compound
  #[serde(default)]
  pub components: Vec<Token>,
  /// Kanji-level reading breakdown of `surface`
  #[serde(default)]
  pub kanji_readings: Vec<KanjiReading>,
}

/// Display subset of a [`Token`] promoted from the first alternative.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenCore {
  /// surface
  pub surface: String,
  /// is_lexical
  pub is_lexical: bool,
  /// reading
  pub reading: String,
  /// kana
  pub kana: String,
  /// romanized
  pub romanized: String,
  /// score
  pub score: i64,
}

impl From<&Token> for TokenCore {
  fn from(token: &Token) -> Self {
    Self {
      surface: token.surface.clone(),
      is_lexical: token.is_lexical,
      reading: token.reading.clone(),
      kana: token.kana.clone(),
      romanized: token.romanized.clone(),
      score: token.score,
    }
  }
}

impl Token {
  /// A non-lexical passthrough token.
  pub fn passthrough(surface: impl Into<String>) -> Self {
    Self {
      surface: surface.into(),
      ..Self::default()
    }
  }

  /// Outer token for a set of alternatives: core fields of the first one, no own semantics.
  ///
  /// Returns `None` for an empty list.
  pub fn from_alternatives(alternatives: Vec<Token>) -> Option<Self> {
    let core = TokenCore::from(alternatives.first()?);
    Some(Self {
      surface: core.surface,
      is_lexical: core.is_lexical,
      reading: core.reading,
      kana: core.kana,
      romanized: core.romanized,
      score: core.score,
      alternatives,
      ..Self::default()
    })
  }

  /// Core projection.
  pub fn core(&self) -> TokenCore {
    TokenCore::from(self)
  }

  /// Direct meanings followed by the meanings of each conjugation's base form.
  pub fn all_glosses(&self) -> Vec<&str> {
    self
      .glosses
      .iter()
      .chain(self.conjugations.iter().flat_map(|c| c.glosses.iter()))
      .map(|g| g.meaning.as_str())
      .collect()
  }

  /// Kana for display; the surface when not lexical or no kana is known.
  pub fn kana_or_surface(&self) -> &str {
    if self.is_lexical && !self.kana.is_empty() {
      &self.kana
    } else {
      &self.surface
    }
  }

  /// Romanized form for display; the surface when not lexical or unknown.
  pub fn romanized_or_surface(&self) -> &str {
    if self.is_lexical && !self.romanized.is_empty() {
      &self.romanized
    } else {
      &self.surface
    }
  }

  /// `"surface(g1; g2)"`, or `"surface (ALT1: …| ALT2: …)"` when alternatives exist.
  ///
  /// Non-lexical tokens and tokens without meanings render as the bare surface.
  pub fn gloss_part(&self) -> String {
    if !self.is_lexical {
      return self.surface.clone();
    }

    if !self.alternatives.is_empty() {
      let annotated: Vec<String> = self
        .alternatives
        .iter()
        .enumerate()
        .filter_map(|(i, alt)| {
          let glosses = alt.all_glosses();
          (!glosses.is_empty()).then(|| format!("ALT{}: {}", i + 1, glosses.join("; ")))
        })
        .collect();
      if annotated.is_empty() {
        return self.surface.clone();
      }
      return format!("{} ({})", self.surface, annotated.join(" | "));
    }

    let glosses = self.all_glosses();
    if glosses.is_empty() {
      self.surface.clone()
    } else {
      format!("{}({})", self.surface, glosses.join("; "))
    }
  }
}

/// Ordered tokens of one analysis (order = textual order).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSequence(Vec<Token>);

impl TokenSequence {
  /// Wraps tokens.
  pub fn new(tokens: Vec<Token>) -> Self {
    Self(tokens)
  }

  /// Unwraps into the token vector.
  pub fn into_inner(self) -> Vec<Token> {
    self.0
  }

  /// Original text reconstructed from surfaces.
  pub fn surface_text(&self) -> String {
    self.0.iter().map(|t| t.surface.as_str()).collect()
  }

  /// Surfaces in order.
  pub fn tokenized_parts(&self) -> Vec<&str> {
    self.0.iter().map(|t| t.surface.as_str()).collect()
  }

  /// Surfaces joined with a space; whitespace runs become `", "`.
  pub fn tokenized(&self) -> String {
    collapse_runs(&self.tokenized_parts().join(" "))
  }

  /// Kana per token (surface fallback).
  pub fn kana_parts(&self) -> Vec<&str> {
    self.0.iter().map(Token::kana_or_surface).collect()
  }

  /// Kana joined without separator; whitespace runs become `", "`.
  pub fn kana(&self) -> String {
    collapse_runs(&self.kana_parts().concat())
  }

  /// Romanized form per token (surface fallback).
  pub fn roman_parts(&self) -> Vec<&str> {
    self.0.iter().map(Token::romanized_or_surface).collect()
  }

  /// Romanized forms joined with a space; whitespace runs become `", "`.
  pub fn roman(&self) -> String {
    collapse_runs(&self.roman_parts().join(" "))
  }

  /// Replaces each compound token by its components (one level), marked lexical.
  pub fn to_morphemes(&self) -> TokenSequence {
    let mut morphemes = Vec::with_capacity(self.0.len());
    for token in &self.0 {
      if token.components.is_empty() {
        morphemes.push(token.clone());
        continue;
      }
      morphemes.extend(token.components.iter().map(|component| Token {
        is_lexical: true,
        ..component.clone()
      }));
    }
    TokenSequence(morphemes)
  }

  /// Gloss-annotated parts over the morpheme view.
  pub fn gloss_parts(&self) -> Vec<String> {
    self.to_morphemes().iter().map(Token::gloss_part).collect()
  }

  /// Gloss-annotated parts joined with a space.
  pub fn gloss(&self) -> String {
    self.gloss_parts().join(" ")
  }
}

fn collapse_runs(s: &str) -> String {
  MULTI_SPACE.replace_all(s, RUN_SEPARATOR).into_owned()
}

impl Deref for TokenSequence {
  type Target = [Token];

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

impl From<Vec<Token>> for TokenSequence {
  fn from(tokens: Vec<Token>) -> Self {
    Self(tokens)
  }
}

impl FromIterator<Token> for TokenSequence {
  fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

impl IntoIterator for TokenSequence {
  type Item = Token;
  type IntoIter = std::vec::IntoIter<Token>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.into_iter()
  }
}

impl<'a> IntoIterator for &'a TokenSequence {
  type Item = &'a Token;
  type IntoIter = std::slice::Iter<'a, Token>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.iter()
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Test Module
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  fn lexical(surface: &str, kana: &str, romanized: &str) -> Token {
    Token {
      surface: surface.to_string(),
      is_lexical: true,
      kana: kana.to_string(),
      romanized: romanized.to_string(),
      ..Token::default()
    }
  }

  fn gloss(meaning: &str) -> Gloss {
    Gloss {
      meaning: meaning.to_string(),
      ..Gloss::default()
    }
  }

  fn sentence() -> TokenSequence {
    TokenSequence::new(vec![
      lexical("私", "わたし", "watashi"),
      lexical("は", "は", "wa"),
      lexical("日本語", "にほんご", "nihongo"),
      lexical("を", "を", "wo"),
      lexical("勉強して", "べんきょうして", "benkyou shite"),
      lexical("います", "います", "imasu"),
      Token::passthrough("。"),
    ])
  }

  // ─── Joined Views ──────────────────────────────────────────────────────

  #[test]
  fn tokenized_joins_surfaces() {
    assert_eq!(sentence().tokenized(), "私 は 日本語 を 勉強して います 。");
  }

  #[test]
  fn kana_joins_without_separator() {
    assert_eq!(sentence().kana(), "わたしはにほんごをべんきょうしています。");
  }

  #[test]
  fn roman_falls_back_to_surface() {
    assert_eq!(
      sentence().roman(),
      "watashi wa nihongo wo benkyou shite imasu 。"
    );
  }

  #[test]
  fn whitespace_runs_collapse_to_comma() {
    let tokens = TokenSequence::new(vec![
      lexical("今日", "きょう", "kyou"),
      Token::passthrough(" "),
      lexical("晴れ", "はれ", "hare"),
    ]);
    // "今日" + " " + " " + " " + "晴れ"
    assert_eq!(tokens.tokenized(), "今日, 晴れ");
    assert_eq!(tokens.roman(), "kyou, hare");
  }

  #[test]
  fn surface_text_reconstructs_input() {
    assert_eq!(sentence().surface_text(), "私は日本語を勉強しています。");
  }

  // ─── Morphemes ─────────────────────────────────────────────────────────

  #[test]
  fn to_morphemes_replaces_compounds_one_level() {
    let mut inner = lexical("し", "し", "shi");
    inner.components = vec![lexical("x", "", "")];
    let mut component = lexical("勉強", "べんきょう", "benkyou");
    component.is_lexical = false;

    let mut compound = lexical("勉強して", "べんきょうして", "benkyou shite");
    compound.components = vec![component, inner];

    let morphemes = TokenSequence::new(vec![compound, Token::passthrough("。")]).to_morphemes();
    assert_eq!(morphemes.len(), 3);
    assert_eq!(morphemes[0].surface, "勉強");
    assert!(morphemes[0].is_lexical);
    assert_eq!(morphemes[1].surface, "し");
    assert_eq!(morphemes[1].components.len(), 1);
    assert!(!morphemes[2].is_lexical);
  }

  // ─── Gloss ─────────────────────────────────────────────────────────────

  #[test]
  fn gloss_includes_conjugation_meanings() {
    let mut token = lexical("います", "います", "imasu");
    token.glosses = vec![gloss("to be")];
    token.conjugations = vec![Conjugation {
      glosses: vec![gloss("to exist")],
      ..Conjugation::default()
    }];

    assert_eq!(token.gloss_part(), "います(to be; to exist)");
  }

  #[test]
  fn gloss_annotates_alternatives() {
    let mut first = lexical("は", "は", "ha");
    first.glosses = vec![gloss("tooth")];
    let second = lexical("は", "は", "wa");
    let mut third = lexical("は", "は", "ha");
    third.glosses = vec![gloss("leaf"), gloss("blade")];

    let token = Token::from_alternatives(vec![first, second, third]).unwrap();
    assert_eq!(token.gloss_part(), "は (ALT1: tooth | ALT3: leaf; blade)");
  }

  #[test]
  fn gloss_without_meanings_is_bare_surface() {
    let tokens = TokenSequence::new(vec![lexical("ね", "ね", "ne"), Token::passthrough("!")]);
    assert_eq!(tokens.gloss(), "ね !");
  }

  // ─── Core Projection ───────────────────────────────────────────────────

  #[test]
  fn from_alternatives_promotes_first_core_only() {
    let mut first = lexical("行った", "いった", "itta");
    first.score = 42;
    first.glosses = vec![gloss("to go")];
    let second = lexical("行った", "おこなった", "okonatta");

    let token = Token::from_alternatives(vec![first.clone(), second]).unwrap();
    assert_eq!(token.core(), first.core());
    assert!(token.glosses.is_empty());
    assert!(token.conjugations.is_empty());
    assert_eq!(token.alternatives.len(), 2);
  }

  #[test]
  fn from_alternatives_rejects_empty_list() {
    assert!(Token::from_alternatives(Vec::new()).is_none());
  }

  #[test]
  fn kanji_reading_regularity() {
    let reading = KanjiReading {
      kanji: "学".to_string(),
      reading: "がっ".to_string(),
      is_linked: true,
      geminated: "っ".to_string(),
      ..KanjiReading::default()
    };
    assert!(!reading.is_regular());
    assert!(!reading.is_group());

    let group = KanjiReading {
      kanji: "今日".to_string(),
      is_linked: true,
      ..KanjiReading::default()
    };
    assert!(group.is_regular());
    assert!(group.is_group());
  }

  #[test]
  fn sequence_serializes_as_array() {
    let json = serde_json::to_value(TokenSequence::new(vec![Token::passthrough("。")])).unwrap();
    assert!(json.is_array());
    assert_eq!(json[0]["surface"], "。");
    assert_eq!(json[0]["is_lexical"], false);
  }
}
