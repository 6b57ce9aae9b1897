//! # Equipment Interface
//!
//! This module defines the interface structures exchanged with the equipment surrounding the
//! cruise controller.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod cam;
pub mod motor;
pub mod perception;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use cam::Frame;
pub use motor::MotorDems;
pub use perception::{BBox, Detection, TargetEstimate};
