//! Display output
//!
//! The board has no panel driver yet; everything the display layer would
//! show is written to the defmt log instead.

pub mod log_sink;

pub use log_sink::LogSink;
