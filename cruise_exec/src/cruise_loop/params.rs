//! Cruise loop parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::follow_arb;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Largest accepted polling period or nominal time step.
///
/// Units: seconds
pub const MAX_PERIOD_S: f64 = 10.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the cruise loop
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Params {
    /// Period at which the camera is polled for a new frame.
    ///
    /// Units: seconds
    pub poll_period_s: f64,

    /// Time step assumed for the first controller update after a start or a mode change,
    /// when there is no previous frame to measure it from.
    ///
    /// Units: seconds
    pub nominal_dt_s: f64,

    /// If set, an obstacle score at or above this threshold stops the robot whatever it is
    /// following. If not set the obstacle score is only reported.
    #[serde(default)]
    pub blocked_stop_threshold: Option<f64>,

    /// Object follow arbitration parameters, used in fleet mode
    #[serde(default)]
    pub follow: follow_arb::Params
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            poll_period_s: 0.005,
            nominal_dt_s: 1.0 / 30.0,
            blocked_stop_threshold: None,
            follow: follow_arb::Params::default()
        }
    }
}

impl Params {
    /// Check the parameters, returning a description of the first problem found.
    pub fn check(&self) -> Result<(), String> {
        let periods = [
            ("poll_period_s", self.poll_period_s),
            ("nominal_dt_s", self.nominal_dt_s)
        ];
        for (name, value) in periods.iter() {
            if !(*value > 0.0 && *value <= MAX_PERIOD_S) {
                return Err(format!(
                    "{} must be greater than 0 and at most {} s, found {}",
                    name, MAX_PERIOD_S, value
                ))
            }
        }
        if let Some(t) = self.blocked_stop_threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(format!(
                    "blocked_stop_threshold must be between 0 and 1, found {}", t
                ))
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_check_periods() {
        assert!(Params::default().check().is_ok());

        for bad in [0.0, -0.1, 1e20, std::f64::INFINITY, std::f64::NAN].iter() {
            let mut p = Params::default();
            p.poll_period_s = *bad;
            assert!(p.check().is_err(), "poll_period_s = {} accepted", bad);

            let mut p = Params::default();
            p.nominal_dt_s = *bad;
            assert!(p.check().is_err(), "nominal_dt_s = {} accepted", bad);
        }

        let mut p = Params::default();
        p.poll_period_s = MAX_PERIOD_S;
        assert!(p.check().is_ok());

        p.blocked_stop_threshold = Some(1.5);
        assert!(p.check().is_err());
    }
}
