//! Data models
pub mod decision;
pub mod token;

pub use decision::{ProcessingDecision, ProcessingStatus, TransliterationResult};
pub use token::{
  Conjugation, ConjugationProperty, Gloss, KanjiReading, Token, TokenCore, TokenSequence,
};
