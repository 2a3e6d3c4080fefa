//! Probe Telemetry Protocol
//!
//! This crate defines the one-directional binary protocol spoken by the
//! measurement probe (primary link) and the radio relay (secondary link)
//! towards the Bathys display unit.
//!
//! # Protocol Overview
//!
//! All frames share one layout, integers and floats little-endian:
//! ```text
//! ┌──────────┬─────┬────────┬─────────┬────────────┬──────────┐
//! │ SYNC     │ CMD │ LENGTH │ SUB_CMD │ PAYLOAD    │ CHECKSUM │
//! │ 0x40 0x46│ 0x09│ 1B     │ 1B      │ LENGTH-1 B │ 1B       │
//! └──────────┴─────┴────────┴─────────┴────────────┴──────────┘
//! ```
//!
//! LENGTH covers SUB_CMD and PAYLOAD (1..=200). CHECKSUM is the XOR of every
//! preceding byte, sync marker included.
//!
//! The link has no flow control and no retransmission. The parser never
//! keeps state between calls: it rescans the receive window from its front,
//! dropping the minimum number of bytes needed to make progress.

#![no_std]
#![deny(unsafe_code)]

pub mod field;
pub mod frame;
pub mod parser;

pub use field::{resolve, FieldKind};
pub use frame::{
    checksum, Frame, FrameError, Payload, SubCommand, CMD_TELEMETRY, MAX_BODY_LEN,
    MAX_FRAME_SIZE, MAX_LABEL_LEN, MAX_MESSAGE_LEN, MIN_FRAME_LEN, SYNC_MARKER,
};
pub use parser::{ByteWindow, FrameParser, ParseStats, RejectReason, MAX_ATTEMPTS};
