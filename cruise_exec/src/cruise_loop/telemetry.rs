//! Cruise loop telemetry

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::follow_arb::FollowMode;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Label text shown while following the road.
pub const ROAD_LABEL_TEXT: &str = "road";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Snapshot of the loop's state, published once per processed frame.
///
/// The snapshot is read-only for observers, it carries no command semantics.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Telemetry {
    /// Number of frames processed since the loop was created
    pub cycle: u64,

    /// Timestamp of the frame this snapshot was produced from
    pub timestamp: Option<DateTime<Utc>>,

    /// Objective driving the robot
    pub mode: FollowMode,

    /// Name of the followed label, or "road"
    pub label_text: String,

    /// Lateral target last acted on
    pub x: f64,

    /// Vertical target last acted on
    pub y: f64,

    /// Steering demand last computed
    pub steering: f64,

    /// Speed demand last computed
    pub speed: f64,

    /// Obstacle score
    pub blocked: f64,

    /// View fraction of the followed object
    pub mean_view: f64,

    /// Left motor demand sent
    pub left: f64,

    /// Right motor demand sent
    pub right: f64,

    /// True if the previous demands were held because the estimate was not confident enough
    pub held: bool
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            cycle: 0,
            timestamp: None,
            mode: FollowMode::RoadFollow,
            label_text: ROAD_LABEL_TEXT.to_string(),
            x: 0.0,
            y: 0.0,
            steering: 0.0,
            speed: 0.0,
            blocked: 0.0,
            mean_view: 0.0,
            left: 0.0,
            right: 0.0,
            held: false
        }
    }
}
