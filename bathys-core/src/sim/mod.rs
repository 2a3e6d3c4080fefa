//! Probe stream simulator
//!
//! Produces the byte stream of a probe on the bench so the display can be
//! exercised without downhole hardware.

pub mod stream;

pub use stream::{fragments, Fragments, StreamSimulator, SIM_BURST_CAP};
