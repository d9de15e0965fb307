//! furikae-api crate
//!
//! Web server exposing the furikae analyzer and selective kana transliteration as HTTP API.
//!
//! ## Endpoints
//! - `POST /analyze` - Analysis (tokens, kana, romanization, glosses)
//! - `POST /transliterate` - Selective kanji-to-kana rewrite with decisions
//! - `GET /status` - Analyzer container state
//! - `GET /health` - Health Check
//!
//! ## Usage Example
//! ```bash
//! curl -X POST http://127.0.0.1:5530/transliterate \
//!   -H "Content-Type: application/json" \
//!   -d '{"text": "私は日本語を勉強します。", "threshold": 1000}'
//! ```

pub mod api;
pub mod config;
pub mod errors;
pub mod models;
pub mod service;

pub use api::AppState;
pub use config::Config;
pub use errors::{ApiError, ApiErrorKind};
pub use models::{AnalyzeRequest, AnalyzeResponse, TokenDto, TransliterateRequest, TransliterateResponse};
pub use service::{FurikaeApiService, FurikaeApiServiceFull};
