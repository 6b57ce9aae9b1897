//! # Cruise loop module
//!
//! The cruise loop turns camera frames into motor demands. While running, a worker thread polls
//! the frame source, runs the vision models on each new frame, computes steering and speed and
//! sends the resulting demands to the motors.
//!
//! Stopping the loop is guaranteed to leave the motors commanded to stop: once `stop` has
//! returned no further non-stop demand is sent.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cycle;
mod params;
mod runner;
mod telemetry;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
pub use cycle::*;
pub use params::*;
pub use runner::*;
pub use telemetry::*;
use comms_if::tc::ConfigError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Lifecycle state of the cruise loop.
#[derive(Debug, Serialize, Copy, Clone, Eq, PartialEq)]
pub enum RunState {
    /// Not driving, the motors have been commanded to stop
    Idle,

    /// The worker is processing frames and driving the motors
    Running,

    /// A stop has been requested and the worker is shutting down
    Stopping
}

/// Possible errors that can occur during cruise loop operation.
#[derive(Debug, thiserror::Error)]
pub enum CruiseError {
    #[error("Invalid cruise configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid cruise loop parameters: {0}")]
    InvalidParams(String),

    #[error("Could not command the motors: {0}")]
    Actuation(String),

    #[error("Equipment panicked during a cycle: {0}")]
    EquipmentPanic(String),

    #[error("Could not spawn the cruise loop worker: {0}")]
    SpawnError(std::io::Error),

    #[error("Frame is not newer than the last processed frame")]
    StaleFrame
}
