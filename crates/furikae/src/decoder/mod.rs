//! Decoding of analyzer answers into typed tokens
pub mod kanji_readings;
pub mod token_decoder;
pub mod unescape;

pub use kanji_readings::parse_kanji_readings;
pub use token_decoder::{Decoded, decode, decode_value, decode_with_warnings};
pub use unescape::normalize_escapes;
