//! # Cruise Executable Parameters
//!
//! Parameters for the cruise executable, loaded from `cruise_exec.toml`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::{cruise_loop, sim::SimParams};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ExecParams {
    /// Cruise loop scheduling and arbitration parameters
    pub cruise_loop: cruise_loop::Params,

    /// Simulated equipment parameters
    #[serde(default)]
    pub sim: SimParams,

    /// If true every telemetry snapshot is written to `telemetry.csv` in the session archive
    #[serde(default)]
    pub archive_telemetry: bool
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_exec_params() {
        let p: ExecParams = util::params::from_str(r#"
            archive_telemetry = true

            [cruise_loop]
            poll_period_s = 0.01
            nominal_dt_s = 0.033
            blocked_stop_threshold = 0.8

            [cruise_loop.follow]
            hysteresis_frames = 5
            labels = ["background", "person"]
        "#).unwrap();

        assert!(p.archive_telemetry);
        assert_eq!(p.cruise_loop.blocked_stop_threshold, Some(0.8));
        assert_eq!(p.cruise_loop.follow.hysteresis_frames, 5);
        assert_eq!(p.cruise_loop.follow.labels.len(), 2);
        assert_eq!(p.sim, SimParams::default());
        assert!(p.cruise_loop.check().is_ok());
    }
}
