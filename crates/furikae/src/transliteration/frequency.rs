//! Kanji frequency table
//!
//! An ordered character list, most frequent first. The 1-based position of a character is
//! its frequency rank.
//!
//! Lookup order when loading:
//! 1. `transliteration.frequency_table` from the configuration
//! 2. User override in the config directory (see [`user_table_path`])
//! 3. The table embedded in the crate

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::ConfigError;

/// Table shipped with the crate (newspaper frequency order).
const EMBEDDED_TABLE: &str = include_str!("../../data/kanji_frequency.txt");

/// File name of the user override.
pub const USER_TABLE_FILE: &str = "kanji_frequency.txt";

/// Read-only rank lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KanjiFrequency {
  chars: Vec<char>,
  ranks: HashMap<char, usize>,
}

impl KanjiFrequency {
  /// Builds a table from text. Whitespace is ignored; a repeated character keeps its first rank.
  pub fn from_text(text: &str) -> Self {
    let mut chars = Vec::new();
    let mut ranks = HashMap::new();
    for c in text.chars().filter(|c| !c.is_whitespace()) {
      if !ranks.contains_key(&c) {
        chars.push(c);
        ranks.insert(c, chars.len());
      }
    }
    Self { chars, ranks }
  }

  /// The embedded table.
  pub fn embedded() -> Result<Self, ConfigError> {
    non_empty(Self::from_text(EMBEDDED_TABLE), "embedded")
  }

  /// Loads a table file.
  pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::FrequencyTableRead {
      path: path.to_path_buf(),
      source: Arc::new(e),
    })?;
    non_empty(Self::from_text(&text), &path.display().to_string())
  }

  /// Loads the table following the lookup order of this module.
  pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
    if let Some(path) = explicit {
      let table = Self::from_path(path)?;
      info!(path = %path.display(), entries = table.len(), "kanji frequency table loaded");
      return Ok(table);
    }

    if let Some(path) = user_table_path().filter(|p| p.is_file()) {
      let table = Self::from_path(&path)?;
      info!(path = %path.display(), entries = table.len(), "user kanji frequency table loaded");
      return Ok(table);
    }

    let table = Self::embedded()?;
    debug!(entries = table.len(), "embedded kanji frequency table loaded");
    Ok(table)
  }

  /// 1-based rank of `c`, `None` if absent.
  pub fn rank(&self, c: char) -> Option<usize> {
    self.ranks.get(&c).copied()
  }

  /// Number of distinct characters (= highest rank).
  pub fn len(&self) -> usize {
    self.chars.len()
  }

  /// No characters.
  pub fn is_empty(&self) -> bool {
    self.chars.is_empty()
  }

  /// Characters, most frequent first.
  pub fn chars(&self) -> &[char] {
    &self.chars
  }
}

fn non_empty(table: KanjiFrequency, source_name: &str) -> Result<KanjiFrequency, ConfigError> {
  if table.is_empty() {
    return Err(ConfigError::EmptyFrequencyTable {
      source_name: source_name.to_string(),
    });
  }
  Ok(table)
}

/// Returns the user override path according to the OS
///
/// | OS      | Example Path                                                  |
/// |---------|---------------------------------------------------------------|
/// | Linux   | `~/.config/furikae/kanji_frequency.txt`                       |
/// | macOS   | `~/Library/Application Support/furikae/kanji_frequency.txt`   |
/// | Windows | `C:\Users\{user}\AppData\Roaming\furikae\kanji_frequency.txt` |
pub fn user_table_path() -> Option<PathBuf> {
  dirs::config_dir().map(|dir| dir.join("furikae").join(USER_TABLE_FILE))
}
