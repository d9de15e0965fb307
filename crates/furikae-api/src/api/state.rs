//! API State Definition

use std::sync::Arc;

use crate::config::Config;
use crate::service::FurikaeApiService;

/// Application State
///
/// State shared across the entire server.
/// Contains configuration and service.
#[derive(Clone)]
pub struct AppState {
  /// Configuration
  pub config: Config,
  /// Analysis Service
  ///
  /// - Production: `Arc::new(FurikaeApiServiceFull::new(&config)?)`
  /// - Test: `Arc::new(StubFurikaeApiService)`
  pub service: Arc<dyn FurikaeApiService>,
}

impl AppState {
  /// Creates a new AppState
  #[must_use]
  pub fn new(config: Config, service: Arc<dyn FurikaeApiService>) -> Self {
    Self { config, service }
  }
}
