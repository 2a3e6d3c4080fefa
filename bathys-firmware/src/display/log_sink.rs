//! defmt-backed display sink

use bathys_core::dispatch::Diagnostics;
use bathys_core::metrics::MetricsState;
use bathys_core::traits::DisplaySink;
use defmt::*;
use embassy_time::{Duration, Instant};

/// What the message area currently shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageState {
    Hidden,
    /// Auto-closes at the deadline
    Until(Instant),
    /// Stays up until the operator dismisses it
    Pinned,
}

/// Display sink that renders to the log
pub struct LogSink {
    message: MessageState,
}

impl LogSink {
    pub const fn new() -> Self {
        Self {
            message: MessageState::Hidden,
        }
    }

    /// Close the current message, if any
    pub fn dismiss(&mut self) {
        if self.message != MessageState::Hidden {
            info!("MESSAGE dismissed");
            self.message = MessageState::Hidden;
        }
    }
}

impl DisplaySink for LogSink {
    fn on_measurement_update(&mut self, m: &MetricsState) {
        info!(
            "INC {} AZI {} TF {} ({:?}) | pump {} on={} valid={} | link {:?} alive={} port={}",
            m.inclination,
            m.azimuth,
            m.toolface,
            m.toolface_kind,
            m.pump_pressure,
            m.pump_on,
            m.pump_pressure_valid,
            m.link_source,
            m.link_alive,
            m.port_connected
        );
        debug!("TF history {:?}", m.toolface_history);
    }

    fn on_decode_event(&mut self, name: &str, value: f32, highlight: bool) {
        if highlight {
            debug!("DECODE >> {} {} <<", name, value);
        } else {
            debug!("DECODE {} {}", name, value);
        }
    }

    fn on_message(&mut self, text: &str, auto_close_ms: u32) {
        self.message = if auto_close_ms == 0 {
            MessageState::Pinned
        } else {
            MessageState::Until(Instant::now() + Duration::from_millis(auto_close_ms as u64))
        };
        info!("MESSAGE [{} ms] {}", auto_close_ms, text);
    }

    fn is_message_active(&self) -> bool {
        match self.message {
            MessageState::Hidden => false,
            MessageState::Until(deadline) => Instant::now() < deadline,
            MessageState::Pinned => true,
        }
    }

    fn on_diagnostics(&mut self, d: &Diagnostics) {
        for link in d.links.iter() {
            let s = &link.stats;
            debug!(
                "DIAG {:?}: ok={} bad={} hdr={} cmd={} len={} sum={} uns={} tmo={} q={} ovf={} rx={} rst={} last={:?}",
                link.source,
                s.frames_ok,
                s.frames_bad,
                s.no_header,
                s.cmd_mismatch,
                s.bad_length,
                s.bad_checksum,
                s.unsupported,
                s.parse_timeout,
                link.queue_len,
                link.overflow,
                link.rx_bytes,
                link.resets,
                link.last_reject
            );
            if link.queue_len > 0 {
                debug!("DIAG {:?}: {}", link.source, link.raw_head);
            }
        }
        debug!(
            "DIAG tick {} last {:?} {}={}",
            d.ticks, d.last_sub_command, d.last_name, d.last_value
        );
    }
}
