//! # Equipment interfaces
//!
//! The cruise loop talks to the camera, the vision models and the motors only through these
//! traits. Implementations may be real hardware drivers, inference engines or the simulated
//! equipment in [`crate::sim`].
//!
//! Sensing-side failures (camera, estimator, detector) are reported as `Err` and absorbed by
//! the loop. Motor failures are fatal for the current run.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use color_eyre::Result;
use comms_if::eqpt::{Detection, Frame, MotorDems, TargetEstimate};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Supplies camera frames.
pub trait FrameSource: Send {
    /// Get the most recent frame, or `None` if no frame is available.
    ///
    /// There is no guarantee that a new frame is returned on every call, the same frame may be
    /// returned again. Only the most recent frame is ever of interest.
    fn latest_frame(&mut self) -> Result<Option<Frame>>;
}

/// The vision models run on each frame.
pub trait TargetEstimator: Send {
    /// Estimate the road-following target for the frame.
    fn estimate(&mut self, frame: &Frame) -> Result<TargetEstimate>;

    /// Detect objects in the frame. Only called in fleet mode.
    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
        Ok(Vec::new())
    }

    /// Probability in [0, 1] that the path ahead is blocked. Only called in fleet mode.
    fn blocked(&mut self, _frame: &Frame) -> Result<f64> {
        Ok(0.0)
    }
}

/// Accepts demands for the drive motors.
pub trait MotorSink: Send {
    /// Drive the motors with the given demands. `MotorDems::STOP` must always be accepted by a
    /// working sink.
    fn drive(&mut self, dems: MotorDems) -> Result<()>;
}
