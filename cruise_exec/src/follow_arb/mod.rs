//! # Object follow arbitration module
//!
//! In fleet mode the robot can follow a detected object instead of the road. Each frame the
//! arbiter decides which of the two objectives drives the robot:
//!
//! 1. Detections are filtered to the tracked label and the confidence threshold.
//! 2. With no match the robot follows the road, using the road estimate unchanged.
//! 3. With matches the largest box (the closest or most salient object) is followed. Its centre
//!    gives the lateral target and its area the view fraction used by the speed policy.
//! 4. Once following an object the arbiter keeps doing so through short detector dropouts.
//!    Only after `hysteresis_frames` consecutive frames without a match does it fall back to
//!    the road. The last matched target is reused while the object is missing.
//!
//! The obstacle ("blocked") score is not part of the decision, it is forwarded as is.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use params::Params;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The objective driving the robot on a given cycle.
#[derive(Debug, Serialize, Copy, Clone, Eq, PartialEq)]
pub enum FollowMode {
    RoadFollow,
    ObjectFollow
}

impl Default for FollowMode {
    fn default() -> Self {
        FollowMode::RoadFollow
    }
}
