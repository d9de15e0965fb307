//! errors module
pub mod error_definition;

/// Re-export major error types
pub use error_definition::{
  ConfigError, DEFAULT_EXCERPT_BYTES, DecodeError, DecodeWarning, ExecutionError, FurikaeError,
  FurikaeResult, ProtocolError, ProvisioningError, RuntimeError, truncate_for_log,
};
