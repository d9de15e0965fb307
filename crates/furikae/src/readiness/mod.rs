//! Analyzer bring-up and readiness detection
pub mod controller;
pub mod signal;

pub use controller::{BringUp, ReadinessController, ReadinessState};
pub use signal::{ListenerGuard, ReadySignal};
