//! Resynchronizing frame parser
//!
//! The parser works directly on a receive window (normally the consumer side
//! of a byte queue) and keeps no parse state between calls. Each call
//! rescans from the front of the window:
//!
//! ```text
//! Seeking ──marker──▶ HeaderPending ──5 bytes──▶ LengthValidated
//!    ▲                                                 │ frame buffered
//!    │                                                 ▼
//!    └──── drop 1 byte ◀── any check fails ── ChecksumValidated ──▶ Decoded
//! ```
//!
//! Only two exits leave the window untouched: fewer bytes than the current
//! candidate needs ("wait"), and a decoded frame, which consumes exactly the
//! frame. Every other path drops at least one byte.

use heapless::Deque;

use crate::frame::{
    checksum, Frame, Payload, CMD_TELEMETRY, HEADER_LEN, MAX_BODY_LEN, MAX_FRAME_SIZE,
    MIN_FRAME_LEN, SYNC_MARKER,
};

/// Resynchronization attempts allowed per call
pub const MAX_ATTEMPTS: usize = 8;

/// Read access to the front of a byte stream, with the ability to discard
pub trait ByteWindow {
    /// Number of buffered bytes
    fn len(&self) -> usize;

    /// Returns true if no bytes are buffered
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Byte at `index` from the front, without consuming it
    fn peek(&self, index: usize) -> Option<u8>;

    /// Discard up to `n` bytes from the front
    fn drop_front(&mut self, n: usize);

    /// Offset of the first occurrence of `pattern`
    fn find(&self, pattern: &[u8]) -> Option<usize> {
        let len = self.len();
        if pattern.is_empty() || pattern.len() > len {
            return None;
        }
        (0..=len - pattern.len()).find(|&start| {
            pattern
                .iter()
                .enumerate()
                .all(|(i, &b)| self.peek(start + i) == Some(b))
        })
    }

    /// Copy bytes from the front into `out` without consuming them
    ///
    /// Returns the number of bytes copied
    fn peek_into(&self, out: &mut [u8]) -> usize {
        let mut copied = 0;
        for slot in out.iter_mut() {
            match self.peek(copied) {
                Some(b) => *slot = b,
                None => break,
            }
            copied += 1;
        }
        copied
    }
}

impl<const N: usize> ByteWindow for Deque<u8, N> {
    fn len(&self) -> usize {
        Deque::len(self)
    }

    fn peek(&self, index: usize) -> Option<u8> {
        self.iter().nth(index).copied()
    }

    fn drop_front(&mut self, n: usize) {
        for _ in 0..n {
            if self.pop_front().is_none() {
                break;
            }
        }
    }
}

/// Why the parser discarded bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RejectReason {
    /// No sync marker in the window
    NoHeader,
    /// Command byte other than `CMD_TELEMETRY`
    CommandMismatch,
    /// LENGTH of zero or above `MAX_BODY_LEN`
    BadLength,
    /// XOR checksum mismatch
    BadChecksum,
    /// Valid frame with an unknown or truncated payload shape
    Unsupported,
    /// Attempt budget exhausted for one call
    AttemptBudget,
}

/// Parser counters, all saturating
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParseStats {
    /// Frames decoded
    pub frames_ok: u32,
    /// Candidates rejected for length or checksum
    pub frames_bad: u32,
    /// Windows trimmed because no marker was present
    pub no_header: u32,
    /// Candidates rejected for their command byte
    pub cmd_mismatch: u32,
    /// Candidates rejected for their LENGTH byte
    pub bad_length: u32,
    /// Candidates rejected for their checksum
    pub bad_checksum: u32,
    /// Valid frames consumed without a usable payload
    pub unsupported: u32,
    /// Calls that ran out of attempts
    pub parse_timeout: u32,
}

/// Outcome of one attempt
enum Step {
    /// A frame was decoded and consumed
    Decoded(Frame),
    /// Not enough bytes; nothing else to do this call
    Wait,
    /// Bytes were dropped; scan again
    Retry,
}

/// Stateless-between-calls frame parser
///
/// Only diagnostic counters persist across calls.
#[derive(Debug, Clone, Default)]
pub struct FrameParser {
    stats: ParseStats,
    last_reject: Option<RejectReason>,
}

impl FrameParser {
    /// Create a new frame parser
    pub fn new() -> Self {
        Self {
            stats: ParseStats::default(),
            last_reject: None,
        }
    }

    /// Diagnostic counters
    pub fn stats(&self) -> &ParseStats {
        &self.stats
    }

    /// Most recent reason bytes were discarded
    pub fn last_reject(&self) -> Option<RejectReason> {
        self.last_reject
    }

    /// Reset counters
    pub fn reset_stats(&mut self) {
        self.stats = ParseStats::default();
        self.last_reject = None;
    }

    /// Try to extract one frame from the front of `window`
    ///
    /// Returns `Some(frame)` once a complete, checksum-valid frame was
    /// consumed, `None` when the caller should try again later. A window
    /// holding fewer than `MIN_FRAME_LEN` bytes is never modified.
    pub fn try_parse_one<W: ByteWindow>(&mut self, window: &mut W) -> Option<Frame> {
        if window.len() < MIN_FRAME_LEN {
            return None;
        }

        for _ in 0..MAX_ATTEMPTS {
            match self.attempt(window) {
                Step::Decoded(frame) => {
                    bump(&mut self.stats.frames_ok);
                    return Some(frame);
                }
                Step::Wait => return None,
                Step::Retry => {}
            }
        }

        // Guarantee forward progress for the next call
        window.drop_front(1);
        bump(&mut self.stats.parse_timeout);
        self.last_reject = Some(RejectReason::AttemptBudget);
        None
    }

    fn attempt<W: ByteWindow>(&mut self, window: &mut W) -> Step {
        // Seeking
        let offset = match window.find(&SYNC_MARKER) {
            Some(offset) => offset,
            None => {
                // The last byte may be the first half of a marker
                let len = window.len();
                if len > 1 {
                    window.drop_front(len - 1);
                    bump(&mut self.stats.no_header);
                    self.last_reject = Some(RejectReason::NoHeader);
                }
                return Step::Wait;
            }
        };
        if offset > 0 {
            window.drop_front(offset);
        }

        // HeaderPending
        if window.len() < MIN_FRAME_LEN {
            return Step::Wait;
        }
        let (command, length) = match (window.peek(2), window.peek(3)) {
            (Some(command), Some(length)) => (command, length as usize),
            _ => return Step::Wait,
        };

        if command != CMD_TELEMETRY {
            window.drop_front(1);
            bump(&mut self.stats.cmd_mismatch);
            self.last_reject = Some(RejectReason::CommandMismatch);
            return Step::Retry;
        }

        if length == 0 || length > MAX_BODY_LEN {
            window.drop_front(1);
            bump(&mut self.stats.frames_bad);
            bump(&mut self.stats.bad_length);
            self.last_reject = Some(RejectReason::BadLength);
            return Step::Retry;
        }

        // LengthValidated
        let frame_len = length + MIN_FRAME_LEN;
        if window.len() < frame_len {
            return Step::Wait;
        }

        let mut raw = [0u8; MAX_FRAME_SIZE];
        let raw = &mut raw[..frame_len];
        if window.peek_into(raw) < frame_len {
            return Step::Wait;
        }

        let expected = raw[frame_len - 1];
        if checksum(&raw[..frame_len - 1]) != expected {
            // Drop only one byte: the marker may recur inside a corrupted
            // payload and start the next real frame
            window.drop_front(1);
            bump(&mut self.stats.frames_bad);
            bump(&mut self.stats.bad_checksum);
            self.last_reject = Some(RejectReason::BadChecksum);
            return Step::Retry;
        }

        // ChecksumValidated
        let payload = Payload::decode(&raw[HEADER_LEN..HEADER_LEN + length]);
        window.drop_front(frame_len);

        match payload {
            Some(payload) => Step::Decoded(Frame { command, payload }),
            None => {
                bump(&mut self.stats.unsupported);
                self.last_reject = Some(RejectReason::Unsupported);
                Step::Retry
            }
        }
    }
}

fn bump(counter: &mut u32) {
    *counter = counter.saturating_add(1);
}
