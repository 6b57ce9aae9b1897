//! # Speed policy
//!
//! Converts how well the target is seen into a forward speed demand. Speed is highest when the
//! view fraction of the target is at its desired value and drops off linearly, at a rate set
//! by `speed_dev`, as it moves away from it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::tc::CruiseConfig;
use util::maths::clamp_unit;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The speed policy, built from a configuration snapshot.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SpeedPolicy {
    speed_gain: f64,
    speed_dev: f64,
    target_view: f64,
    confidence_threshold: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl From<&CruiseConfig> for SpeedPolicy {
    fn from(cfg: &CruiseConfig) -> Self {
        Self {
            speed_gain: cfg.speed_gain,
            speed_dev: cfg.speed_dev,
            target_view: cfg.target_view,
            confidence_threshold: cfg.confidence_threshold
        }
    }
}

impl SpeedPolicy {
    /// Get the speed demand, in [0, speed_gain].
    ///
    /// Estimates below the confidence threshold are not acted on, giving zero speed.
    pub fn compute(&self, confidence: f64, view_fraction: f64) -> f64 {
        if !(confidence >= self.confidence_threshold) {
            return 0.0
        }

        let deviation = (view_fraction - self.target_view).abs();

        self.speed_gain * clamp_unit(1.0 - self.speed_dev * deviation)
    }

    /// The speed demanded when the target is seen at exactly the desired view fraction.
    pub fn nominal_speed(&self) -> f64 {
        self.speed_gain
    }

    pub fn target_view(&self) -> f64 {
        self.target_view
    }
}
