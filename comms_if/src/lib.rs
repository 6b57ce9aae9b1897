//! # Communications interface crate.
//!
//! Provides the interface types shared between the cruise controller and the equipment it
//! drives or is fed by (camera, vision model, motors), along with the telecommands used to
//! operate it.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Telecommand definitions, including the cruise configuration carried by them
pub mod tc;

/// Data exchanged with equipment (camera frames, vision estimates, motor demands)
pub mod eqpt;
