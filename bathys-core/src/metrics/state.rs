//! Latest decoded measurements and link status
//!
//! Mutated only by the dispatcher; sinks receive it by reference.

use bathys_protocol::FieldKind;

/// Number of toolface readings kept for the history dial
pub const TOOLFACE_HISTORY_LEN: usize = 5;

/// One toolface reading and the reference it was measured against
pub type ToolfaceSample = (f32, FieldKind);

/// Physical UART that produced the most recent byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LinkSource {
    /// Direct probe connection
    Primary,
    /// Relay / surface decoder connection
    Secondary,
    /// No byte seen yet
    #[default]
    Unknown,
}

/// Snapshot of everything the display shows
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MetricsState {
    /// Inclination (degrees)
    pub inclination: f32,
    /// Azimuth (degrees)
    pub azimuth: f32,
    /// Most recent toolface (degrees)
    pub toolface: f32,
    /// Reference of the most recent toolface
    pub toolface_kind: FieldKind,
    /// Oldest at index 0, newest last; unfilled slots hold `(0.0, Unknown)`
    pub toolface_history: [ToolfaceSample; TOOLFACE_HISTORY_LEN],
    /// Effective pump pressure
    pub pump_pressure: f32,
    /// Set once any pump frame arrived
    pub pump_pressure_valid: bool,
    /// Pressure above the pump-on threshold
    pub pump_on: bool,
    /// Link that produced the most recent byte
    pub link_source: LinkSource,
    /// Liveness with hysteresis
    pub link_alive: bool,
    /// Timestamp of the most recent byte on any link (ms)
    pub last_byte_at: Option<u32>,
    /// Frames are arriving; cleared after prolonged frame silence
    pub port_connected: bool,
}

impl Default for MetricsState {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsState {
    pub const fn new() -> Self {
        Self {
            inclination: 0.0,
            azimuth: 0.0,
            toolface: 0.0,
            toolface_kind: FieldKind::Unknown,
            toolface_history: [(0.0, FieldKind::Unknown); TOOLFACE_HISTORY_LEN],
            pump_pressure: 0.0,
            pump_pressure_valid: false,
            pump_on: false,
            link_source: LinkSource::Unknown,
            link_alive: false,
            last_byte_at: None,
            port_connected: false,
        }
    }

    /// Apply a pump frame
    ///
    /// The first transducer wins when it reads positive, otherwise the
    /// second is used. Returns the effective pressure.
    pub fn apply_pump(&mut self, pressure_a: f32, pressure_b: f32, on_threshold: f32) -> f32 {
        let pressure = if pressure_a > 0.0 { pressure_a } else { pressure_b };
        self.pump_pressure = pressure;
        self.pump_pressure_valid = true;
        self.pump_on = pressure > on_threshold;
        pressure
    }

    /// Apply a field sample
    ///
    /// Returns false for kinds that carry no displayed measurement.
    pub fn apply_sample(&mut self, kind: FieldKind, value: f32) -> bool {
        match kind {
            FieldKind::Inclination => self.inclination = value,
            FieldKind::Azimuth => self.azimuth = value,
            FieldKind::Toolface | FieldKind::GravityToolface | FieldKind::MagneticToolface => {
                self.push_toolface(value, kind)
            }
            FieldKind::Sync | FieldKind::Unknown => return false,
        }
        true
    }

    /// Record a toolface reading, shifting the history left by one
    pub fn push_toolface(&mut self, value: f32, kind: FieldKind) {
        self.toolface_history.copy_within(1.., 0);
        self.toolface_history[TOOLFACE_HISTORY_LEN - 1] = (value, kind);
        self.toolface = value;
        self.toolface_kind = kind;
    }
}
