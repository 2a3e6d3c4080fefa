//! Minimal TOML-subset parser for `telemetry.toml`
//!
//! Handles only what the telemetry configuration needs; it is NOT a general
//! TOML parser.
//!
//! Supported:
//! - `[section]` and `[section.subsection]` headers
//! - `key = value` with integer, boolean and string values
//! - Comments (`# ...`), including trailing ones
//!
//! Keys not listed below are rejected so typos do not go unnoticed.

use super::types::{LinkConfig, Parity, TelemetryConfig};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header
    InvalidSection,
    /// Key not valid in its section
    UnknownKey,
    /// Value of the wrong type or out of range
    InvalidValue,
    /// Line is neither a header nor `key = value`
    Syntax,
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    PrimaryLink,
    SecondaryLink,
    Dispatch,
    Liveness,
}

/// Parse configuration text, starting from defaults
pub fn parse_config(input: &str) -> Result<TelemetryConfig, ParseError> {
    let mut config = TelemetryConfig::default();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') {
            let header = strip_comment(line);
            if !header.ends_with(']') {
                return Err(ParseError::InvalidSection);
            }
            section = parse_section_header(&header[1..header.len() - 1])?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ParseError::Syntax)?;
        apply_value(section, key, value, &mut config)?;
    }

    Ok(config)
}

fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    match header.trim() {
        "link.primary" => Ok(Section::PrimaryLink),
        "link.secondary" => Ok(Section::SecondaryLink),
        "dispatch" => Ok(Section::Dispatch),
        "liveness" => Ok(Section::Liveness),
        _ => Err(ParseError::InvalidSection),
    }
}

/// Drop a trailing comment unless the `#` sits inside a string
fn strip_comment(text: &str) -> &str {
    match text.find('#') {
        Some(hash_pos) if text[..hash_pos].matches('"').count() % 2 == 0 => {
            text[..hash_pos].trim()
        }
        _ => text,
    }
}

fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = strip_comment(line[eq_pos + 1..].trim());

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

fn parse_string(value: &str) -> Result<&str, ParseError> {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        Ok(&value[1..value.len() - 1])
    } else {
        Err(ParseError::InvalidValue)
    }
}

fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ParseError> {
    // TOML allows underscores as digit separators
    let mut digits: heapless::String<16> = heapless::String::new();
    for c in value.chars().filter(|&c| c != '_') {
        digits.push(c).map_err(|_| ParseError::InvalidValue)?;
    }
    digits.parse().map_err(|_| ParseError::InvalidValue)
}

fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

fn parse_parity(value: &str) -> Result<Parity, ParseError> {
    match parse_string(value)? {
        "none" => Ok(Parity::None),
        "even" => Ok(Parity::Even),
        "odd" => Ok(Parity::Odd),
        _ => Err(ParseError::InvalidValue),
    }
}

fn apply_value(
    section: Section,
    key: &str,
    value: &str,
    config: &mut TelemetryConfig,
) -> Result<(), ParseError> {
    match section {
        Section::Root => Err(ParseError::UnknownKey),
        Section::PrimaryLink => apply_link_value(key, value, &mut config.primary),
        Section::SecondaryLink => apply_link_value(key, value, &mut config.secondary),
        Section::Dispatch => {
            let dispatch = &mut config.dispatch;
            match key {
                "tick_ms" => dispatch.tick_ms = parse_int(value)?,
                "max_frames_per_tick" => dispatch.max_frames_per_tick = parse_int(value)?,
                "decode_throttle_ms" => dispatch.decode_throttle_ms = parse_int(value)?,
                "diagnostics_period_ms" => dispatch.diagnostics_period_ms = parse_int(value)?,
                "frame_timeout_ms" => dispatch.frame_timeout_ms = parse_int(value)?,
                "pump_on_threshold_x100" => dispatch.pump_on_threshold_x100 = parse_int(value)?,
                _ => return Err(ParseError::UnknownKey),
            }
            Ok(())
        }
        Section::Liveness => {
            let liveness = &mut config.liveness;
            match key {
                "alive_within_ms" => liveness.alive_within_ms = parse_int(value)?,
                "dead_after_ms" => liveness.dead_after_ms = parse_int(value)?,
                _ => return Err(ParseError::UnknownKey),
            }
            Ok(())
        }
    }
}

fn apply_link_value(key: &str, value: &str, link: &mut LinkConfig) -> Result<(), ParseError> {
    match key {
        "enabled" => link.enabled = parse_bool(value)?,
        "baudrate" => link.baudrate = parse_int(value)?,
        "parity" => link.parity = parse_parity(value)?,
        "quiet_ms" => link.quiet_ms = parse_int(value)?,
        _ => return Err(ParseError::UnknownKey),
    }
    Ok(())
}
