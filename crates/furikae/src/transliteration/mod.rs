//! Frequency-based selective transliteration
pub mod engine;
pub mod frequency;

pub use engine::{Transliterator, contains_kanji};
pub use frequency::{KanjiFrequency, USER_TABLE_FILE, user_table_path};
