//! Interfaces between the pipeline and the presentation layer
//!
//! The dispatcher only talks to the display through these traits, so the
//! same pipeline drives an LCD, a log sink or a test recorder.

pub mod sink;

pub use sink::DisplaySink;
