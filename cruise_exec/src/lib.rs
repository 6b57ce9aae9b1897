//! # Cruise library.
//!
//! Vision-guided cruise control for a differential-drive robot. Each camera frame is turned into
//! a lateral target, steered towards with a PD controller, while the forward speed is scaled by
//! how well the target sits in view. In fleet mode the robot can instead follow a detected
//! object of a chosen label.
//!
//! The loop is headless: camera, vision models and motors are reached through the traits in
//! [`interfaces`], and the loop is driven through its lifecycle, configuration and telemetry
//! surfaces.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Cruise loop - schedules the per-frame processing and owns the start/stop lifecycle
pub mod cruise_loop;

/// Object follow arbitration - chooses between following the road and a detected object
pub mod follow_arb;

/// Equipment interfaces - camera, vision models and motors
pub mod interfaces;

/// Executable parameters
pub mod params;

/// Simulated equipment for headless runs
pub mod sim;

/// Speed policy - forward speed from confidence and view fraction
pub mod speed_policy;

/// Steering control - PD control of the target's lateral offset
pub mod steer_ctrl;
