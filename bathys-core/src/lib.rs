//! Board-agnostic telemetry ingestion for the downhole display
//!
//! This crate contains everything between the UART byte callbacks and the
//! display layer that does not depend on specific hardware:
//!
//! - Lock-free single-producer/single-consumer byte queue per link
//! - Measurement snapshot with toolface history and link state
//! - Link liveness monitoring with hysteresis
//! - Dispatcher draining the frame parsers into the snapshot
//! - Display sink trait implemented by the UI layer
//! - Configuration types and a small TOML-subset parser
//! - Deterministic probe stream simulator

#![no_std]
#![deny(unsafe_code)]

pub mod config;
pub mod dispatch;
pub mod link;
pub mod metrics;
pub mod queue;
pub mod sim;
pub mod traits;
