//! # Steering control module
//!
//! Steering control converts the lateral offset of the road target into a steering demand. It
//! uses a PD controller on the offset, plus a constant bias which compensates for mechanical or
//! camera misalignment.
//!
//! The derivative is computed over the time elapsed between the frames the offsets came from,
//! rather than assuming a fixed cycle rate, as frames do not arrive at a constant cadence.
//!
//! The output is saturated to [-1, 1], where positive values turn the robot to the right.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod controller;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use controller::*;
