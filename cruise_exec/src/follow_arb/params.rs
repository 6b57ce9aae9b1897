//! Object follow arbitration parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the object follow arbiter
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Params {
    /// Number of consecutive frames without a match after which object following falls back
    /// to road following.
    #[serde(default = "default_hysteresis_frames")]
    pub hysteresis_frames: usize,

    /// Names of the detector's labels, indexed by label. This defines the label space: a
    /// tracked label outside of it is never followed.
    pub labels: Vec<String>
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn default_hysteresis_frames() -> usize {
    3
}

impl Default for Params {
    fn default() -> Self {
        Self {
            hysteresis_frames: default_hysteresis_frames(),
            labels: Vec::new()
        }
    }
}
