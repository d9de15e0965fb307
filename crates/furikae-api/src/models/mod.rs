//! モデルモジュール

mod request;
mod response;

pub use request::{AnalyzeRequest, TransliterateRequest};
pub use response::{AnalyzeResponse, StatusResponse, TokenDto, TransliterateResponse};
