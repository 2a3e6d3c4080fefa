//! Display sink trait

use crate::dispatch::Diagnostics;
use crate::metrics::MetricsState;

/// Receiver of everything the dispatcher wants shown
///
/// Calls happen on the dispatcher's context, one at a time. Implementations
/// should return quickly; the dispatcher holds no locks while calling them.
pub trait DisplaySink {
    /// Measurement snapshot changed
    ///
    /// Deferred by the dispatcher while a message is being shown.
    fn on_measurement_update(&mut self, metrics: &MetricsState);

    /// Append a row to the decode log
    ///
    /// - `name`: Short field name, or the probe label for unknown fields
    /// - `highlight`: Row should stand out (sync header)
    fn on_decode_event(&mut self, name: &str, value: f32, highlight: bool);

    /// Show an operator message
    ///
    /// - `auto_close_ms`: Close after this long; 0 keeps it open
    fn on_message(&mut self, text: &str, auto_close_ms: u32);

    /// Returns true while a message covers the measurement view
    fn is_message_active(&self) -> bool;

    /// Periodic pipeline diagnostics
    fn on_diagnostics(&mut self, _diagnostics: &Diagnostics) {}
}
