//! Frame dispatch
//!
//! Drains the per-link parsers on every tick, folds decoded frames into the
//! [`MetricsState`](crate::metrics::MetricsState) and forwards the results to
//! a [`DisplaySink`](crate::traits::DisplaySink).

pub mod diagnostics;
pub mod dispatcher;

pub use diagnostics::{hex_preview, Diagnostics, LinkDiagnostics, RAW_PREVIEW_BYTES, RAW_PREVIEW_LEN};
pub use dispatcher::{auto_close_ms, DispatchError, Dispatcher, MAX_LINKS};
