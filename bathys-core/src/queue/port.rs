//! Receive-side entry point for one UART link

use super::ring::{Producer, QueueFull};
use crate::metrics::LinkSource;

/// What happened to a received byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxOutcome {
    /// Byte appended to the queue
    Queued,
    /// Queue full; byte discarded and counted
    Overflow,
    /// Inside the startup quiet window; byte discarded
    Ignored,
}

/// Producer half tagged with its link, plus the startup quiet window
///
/// UART receivers can latch a few glitch bytes while the transceiver powers
/// up, so bytes arriving before the quiet deadline are thrown away.
pub struct RxPort<'a, const N: usize> {
    producer: Producer<'a, N>,
    source: LinkSource,
    quiet_until_ms: Option<u32>,
}

impl<'a, const N: usize> RxPort<'a, N> {
    /// Wrap a producer without a quiet window
    pub fn new(producer: Producer<'a, N>, source: LinkSource) -> Self {
        Self {
            producer,
            source,
            quiet_until_ms: None,
        }
    }

    /// Ignore bytes until `quiet_ms` after `started_ms`
    pub fn with_quiet_window(mut self, started_ms: u32, quiet_ms: u32) -> Self {
        self.quiet_until_ms = (quiet_ms > 0).then(|| started_ms.wrapping_add(quiet_ms));
        self
    }

    /// Link this port feeds
    pub fn source(&self) -> LinkSource {
        self.source
    }

    /// Returns true while bytes are still being ignored
    pub fn is_quiet(&self, now_ms: u32) -> bool {
        match self.quiet_until_ms {
            Some(until) => (now_ms.wrapping_sub(until) as i32) < 0,
            None => false,
        }
    }

    /// Per-byte receive hook
    ///
    /// Stamps the link's last-byte time before attempting the push, so an
    /// overflowing link still counts as alive.
    pub fn on_byte_received(&mut self, byte: u8, now_ms: u32) -> RxOutcome {
        if self.quiet_until_ms.is_some() {
            if self.is_quiet(now_ms) {
                return RxOutcome::Ignored;
            }
            self.quiet_until_ms = None;
        }

        self.producer.stamp(now_ms);
        match self.producer.push(byte) {
            Ok(()) => RxOutcome::Queued,
            Err(QueueFull) => RxOutcome::Overflow,
        }
    }

    /// Feed a received chunk; returns how many bytes overflowed
    pub fn on_bytes_received(&mut self, bytes: &[u8], now_ms: u32) -> usize {
        bytes
            .iter()
            .filter(|&&b| self.on_byte_received(b, now_ms) == RxOutcome::Overflow)
            .count()
    }
}
