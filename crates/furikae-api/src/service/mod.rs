//! サービスモジュール

mod furikae_api_service;

pub use furikae_api_service::{FurikaeApiService, FurikaeApiServiceFull, validate_text};
