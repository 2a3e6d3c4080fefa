//! Link liveness monitor
//!
//! Derives a single alive/dead verdict from the time since the last received
//! byte. The verdict only flips outside the hysteresis band, so a link that
//! hovers around one threshold does not flicker on the display.

use crate::config::LivenessConfig;

/// Milliseconds from `at` to `now_ms` on a wrapping u32 clock
///
/// A stamp up to half the clock range ahead of `now_ms` counts as zero:
/// the receive path can stamp a byte after the dispatcher sampled its time.
pub fn elapsed_ms(now_ms: u32, at: u32) -> u32 {
    (now_ms.wrapping_sub(at) as i32).max(0) as u32
}

/// Verdict transition reported by [`LivenessMonitor::evaluate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkChange {
    Unchanged,
    /// Link became alive
    Up,
    /// Link was declared dead
    Down,
}

/// Liveness state with hysteresis
#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    config: LivenessConfig,
    alive: bool,
}

impl Default for LivenessMonitor {
    fn default() -> Self {
        Self::new(LivenessConfig::default())
    }
}

impl LivenessMonitor {
    /// Create a monitor; the link starts dead
    pub fn new(config: LivenessConfig) -> Self {
        Self {
            config,
            alive: false,
        }
    }

    /// Re-evaluate against the most recent byte time
    ///
    /// # Arguments
    /// - `last_byte_at`: Time of the most recent byte, None if none arrived
    /// - `now_ms`: Current time; see [`elapsed_ms`]
    pub fn evaluate(&mut self, last_byte_at: Option<u32>, now_ms: u32) -> LinkChange {
        let alive = match last_byte_at {
            None => false,
            Some(at) => {
                let elapsed = elapsed_ms(now_ms, at);
                if elapsed < self.config.alive_within_ms {
                    true
                } else if elapsed > self.config.dead_after_ms {
                    false
                } else {
                    self.alive
                }
            }
        };

        match (self.alive, alive) {
            (false, true) => {
                self.alive = true;
                LinkChange::Up
            }
            (true, false) => {
                self.alive = false;
                LinkChange::Down
            }
            _ => LinkChange::Unchanged,
        }
    }

    /// Current verdict
    pub fn is_alive(&self) -> bool {
        self.alive
    }
}
