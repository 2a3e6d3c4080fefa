//! Configuration data structures

/// UART parity setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Parity {
    None,
    Even,
    /// Probe default
    #[default]
    Odd,
}

/// Receive-side settings for one UART link
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkConfig {
    /// Start the receiver at boot
    pub enabled: bool,
    /// Baud rate
    pub baudrate: u32,
    /// Parity (8 data bits, 1 stop bit)
    pub parity: Parity,
    /// Bytes arriving this long after start are discarded (ms)
    pub quiet_ms: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            baudrate: 38_400,
            parity: Parity::Odd,
            quiet_ms: 300,
        }
    }
}

/// Dispatcher cadence and limits
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DispatchConfig {
    /// Dispatch tick period (ms)
    pub tick_ms: u32,
    /// Upper bound on frames decoded per tick, across all links
    pub max_frames_per_tick: u16,
    /// Minimum spacing of decode-log events (ms)
    pub decode_throttle_ms: u32,
    /// Diagnostics snapshot period (ms)
    pub diagnostics_period_ms: u32,
    /// Flush a link after this long without a valid frame (ms)
    pub frame_timeout_ms: u32,
    /// Pump-on threshold (×100 for 0.01 resolution)
    pub pump_on_threshold_x100: u16,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            tick_ms: 5,
            max_frames_per_tick: 100,
            decode_throttle_ms: 300,
            diagnostics_period_ms: 1000,
            frame_timeout_ms: 2000,
            pump_on_threshold_x100: 200,
        }
    }
}

impl DispatchConfig {
    /// Pump-on threshold in pressure units
    pub fn pump_on_threshold(&self) -> f32 {
        self.pump_on_threshold_x100 as f32 / 100.0
    }
}

/// Link liveness thresholds
///
/// Between the two thresholds the previous verdict is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LivenessConfig {
    /// A byte within this window marks the link alive (ms)
    pub alive_within_ms: u32,
    /// No byte for longer than this marks the link dead (ms)
    pub dead_after_ms: u32,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            alive_within_ms: 10_000,
            dead_after_ms: 12_000,
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TelemetryConfig {
    /// Direct probe link
    pub primary: LinkConfig,
    /// Relay link
    pub secondary: LinkConfig,
    pub dispatch: DispatchConfig,
    pub liveness: LivenessConfig,
}

/// Configuration rejected by [`TelemetryConfig::validate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Baud rate of zero
    InvalidBaudrate,
    /// Zero tick period or frame budget
    InvalidDispatch,
    /// Dead threshold below alive threshold
    InvalidLiveness,
}

impl TelemetryConfig {
    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        for link in [&self.primary, &self.secondary] {
            if link.enabled && link.baudrate == 0 {
                return Err(ConfigError::InvalidBaudrate);
            }
        }
        if self.dispatch.tick_ms == 0 || self.dispatch.max_frames_per_tick == 0 {
            return Err(ConfigError::InvalidDispatch);
        }
        if self.liveness.dead_after_ms < self.liveness.alive_within_ms {
            return Err(ConfigError::InvalidLiveness);
        }
        Ok(())
    }
}
