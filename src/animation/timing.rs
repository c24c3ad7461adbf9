//! Fixed linear maps from `[0, 100]` controls to engine units.

use serde::{Deserialize, Serialize};

/// Engine units per second at `motionSpeed = 100`.
pub const MAX_SPEED_UNITS: f64 = 12.5;

/// One animation cycle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleTiming {
    /// Cycle length in engine units; at 1 unit/second a cycle lasts this many seconds.
    pub duration: f64,
    #[serde(rename = "loop")]
    pub looping: bool,
}

impl Default for CycleTiming {
    fn default() -> Self {
        Self {
            duration: 16.0,
            looping: true,
        }
    }
}

impl CycleTiming {
    /// Cycle progress after `elapsed_secs` at `motion_speed`.
    ///
    /// Looping cycles wrap into `[0, 1)`; non-looping cycles clamp at 1 and hold.
    pub fn progress(&self, elapsed_secs: f64, motion_speed: f64) -> f64 {
        if self.duration.is_nan() || self.duration <= 0.0 || !elapsed_secs.is_finite() {
            return 0.0;
        }
        let raw = (elapsed_secs.max(0.0) * speed_units(motion_speed) / self.duration).max(0.0);
        if self.looping {
            raw.rem_euclid(1.0)
        } else {
            raw.min(1.0)
        }
    }
}

/// `[0, 100]` speed control to engine units per second.
pub fn speed_units(motion_speed: f64) -> f64 {
    motion_speed.clamp(0.0, 100.0) / 100.0 * MAX_SPEED_UNITS
}

/// `[0, 100]` intensity control to the `motionScale` passed to path functions.
pub fn motion_scale(motion_intensity: f64) -> f64 {
    motion_intensity.clamp(0.0, 100.0) / 100.0
}

#[cfg(test)]
#[path = "../../tests/unit/animation/timing.rs"]
mod tests;
