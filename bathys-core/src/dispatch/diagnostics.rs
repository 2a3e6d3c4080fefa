//! Periodic pipeline diagnostics

use core::fmt::Write;

use bathys_protocol::{ParseStats, RejectReason, SubCommand, MAX_LABEL_LEN};
use heapless::{String, Vec};

use super::dispatcher::MAX_LINKS;
use crate::metrics::LinkSource;

/// Queue-head bytes included in the raw preview
pub const RAW_PREVIEW_BYTES: usize = 16;

/// "RAW:" followed by " XX" per byte
pub const RAW_PREVIEW_LEN: usize = 4 + RAW_PREVIEW_BYTES * 3;

/// Counters for one link
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkDiagnostics {
    pub source: LinkSource,
    /// Parser counters
    pub stats: ParseStats,
    /// Why the parser last discarded bytes
    pub last_reject: Option<RejectReason>,
    /// Bytes waiting in the queue
    pub queue_len: u32,
    /// Bytes lost to queue overflow
    pub overflow: u32,
    /// Bytes seen by the receive path
    pub rx_bytes: u32,
    /// Queue flushes after frame silence
    pub resets: u32,
    /// Hex dump of the queue head
    pub raw_head: String<RAW_PREVIEW_LEN>,
}

/// Snapshot published every diagnostics period
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Diagnostics {
    /// Time of the snapshot (ms)
    pub now_ms: u32,
    /// Dispatch ticks since start
    pub ticks: u32,
    pub links: Vec<LinkDiagnostics, MAX_LINKS>,
    /// Sub-command of the last decoded frame
    pub last_sub_command: Option<SubCommand>,
    /// Name of the last decoded item
    pub last_name: String<MAX_LABEL_LEN>,
    /// Value of the last decoded item
    pub last_value: f32,
}

/// Format bytes as `RAW: 40 46 09 ...`, at most [`RAW_PREVIEW_BYTES`]
pub fn hex_preview(bytes: &[u8]) -> String<RAW_PREVIEW_LEN> {
    let mut out = String::new();
    // Capacity covers the worst case, writes cannot fail
    let _ = out.push_str("RAW:");
    for byte in bytes.iter().take(RAW_PREVIEW_BYTES) {
        let _ = write!(out, " {:02X}", byte);
    }
    out
}
