//! Configuration types
//!
//! Board-agnostic tuning for the ingestion pipeline. The firmware embeds a
//! `telemetry.toml` and parses it at boot with [`parse_config`].

pub mod toml;
pub mod types;

pub use self::toml::{parse_config, ParseError};
pub use types::*;
