//! Config module

mod constants;
mod env;

pub use constants::{
  DEFAULT_BIND_ADDR, ENV_BIND_ADDR, ENV_CONTAINER, ENV_DOCKER_HOST, ENV_FREQUENCY_TABLE,
  ENV_QUERY_TIMEOUT_SECS, MAX_TEXT_LENGTH,
};
pub use env::Config;
