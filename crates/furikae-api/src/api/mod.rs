//! API module

mod handlers;
mod routes;
mod state;

pub use handlers::{get_status, health_check, post_analyze, post_transliterate};
pub use routes::{create_router, run_server, shutdown_signal};
pub use state::AppState;
