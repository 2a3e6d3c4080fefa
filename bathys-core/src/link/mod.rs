//! Link health tracking

pub mod liveness;

pub use liveness::{elapsed_ms, LinkChange, LivenessMonitor};
