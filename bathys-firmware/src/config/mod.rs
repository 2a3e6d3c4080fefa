//! Configuration loading
//!
//! The configuration is compiled in from `telemetry.toml` (validated by the
//! build script) and parsed at boot with the core crate's no_std parser.

use bathys_core::config::{parse_config, TelemetryConfig};
use defmt::*;

/// Embedded configuration; edit telemetry.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../../telemetry.toml");

/// Parse and validate the embedded configuration
///
/// Falls back to defaults if the text is rejected, which should only happen
/// when the build-time check and the firmware parser disagree.
pub fn load() -> TelemetryConfig {
    let config = match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to parse embedded config: {:?}", e);
            error!("Using default configuration");
            return TelemetryConfig::default();
        }
    };

    if let Err(e) = config.validate() {
        error!("Embedded config rejected: {:?}", e);
        error!("Using default configuration");
        return TelemetryConfig::default();
    }

    info!(
        "Config: primary {} baud ({}), secondary {} baud ({}), tick {} ms",
        config.primary.baudrate,
        config.primary.enabled,
        config.secondary.baudrate,
        config.secondary.enabled,
        config.dispatch.tick_ms
    );
    config
}
