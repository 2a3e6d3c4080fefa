//! Measurement snapshot consumed by the display layer

pub mod state;

pub use state::{LinkSource, MetricsState, ToolfaceSample, TOOLFACE_HISTORY_LEN};
