//! # Cruise configuration
//!
//! The tunable parameters of the cruise controller. A configuration is an immutable snapshot:
//! live tuning replaces the whole snapshot, it never edits one in place.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Cruise controller configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CruiseConfig {
    /// Maximum forward speed demand, in [0, 1]
    pub speed_gain: f64,

    /// Steering proportional gain
    pub steering_gain: f64,

    /// Steering derivative gain
    pub steering_dgain: f64,

    /// Constant steering offset compensating mechanical or camera bias. May be negative.
    pub steering_bias: f64,

    /// How aggressively speed drops as the view fraction moves away from `target_view`
    pub speed_dev: f64,

    /// Steering gain used while following an object
    pub turn_gain: f64,

    /// Desired view fraction (bbox area) of a followed object, in [0, 1]
    pub target_view: f64,

    /// Minimum estimator confidence required to act on an estimate, in [0, 1]
    pub confidence_threshold: f64,

    /// Label of the object to follow in fleet mode, or `None` to only follow the road
    #[serde(default)]
    pub tracked_label: Option<u32>
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The named tunables of a [`CruiseConfig`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Tunable {
    SpeedGain,
    SteeringGain,
    SteeringDgain,
    SteeringBias,
    SpeedDev,
    TurnGain,
    TargetView,
    ConfidenceThreshold
}

/// Reasons a configuration can be rejected.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be a finite number, found {1}")]
    NotFinite(&'static str, f64),

    #[error("{0} must not be negative, found {1}")]
    NegativeGain(&'static str, f64),

    #[error("{name} must be between {min} and {max}, found {value}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64
    },

    #[error("Unknown tunable \"{0}\"")]
    UnknownTunable(String)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for CruiseConfig {
    fn default() -> Self {
        Self {
            speed_gain: 0.2,
            steering_gain: 0.08,
            steering_dgain: 0.82,
            steering_bias: -0.01,
            speed_dev: 1.0,
            turn_gain: 0.8,
            target_view: 0.2,
            confidence_threshold: 0.3,
            tracked_label: None
        }
    }
}

impl CruiseConfig {
    /// Check that every tunable holds an acceptable value.
    ///
    /// Values are never clamped here, an out of range value is an error for the caller.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for t in Tunable::ALL.iter() {
            let value = self.get(*t);

            if !value.is_finite() {
                return Err(ConfigError::NotFinite(t.name(), value))
            }

            match t {
                Tunable::SteeringBias => (),
                Tunable::SpeedGain | Tunable::TargetView | Tunable::ConfidenceThreshold => {
                    if !(0.0..=1.0).contains(&value) {
                        return Err(ConfigError::OutOfRange {
                            name: t.name(),
                            value,
                            min: 0.0,
                            max: 1.0
                        })
                    }
                },
                _ => if value < 0.0 {
                    return Err(ConfigError::NegativeGain(t.name(), value))
                }
            }
        }

        Ok(())
    }

    /// Get the value of a tunable.
    pub fn get(&self, tunable: Tunable) -> f64 {
        match tunable {
            Tunable::SpeedGain => self.speed_gain,
            Tunable::SteeringGain => self.steering_gain,
            Tunable::SteeringDgain => self.steering_dgain,
            Tunable::SteeringBias => self.steering_bias,
            Tunable::SpeedDev => self.speed_dev,
            Tunable::TurnGain => self.turn_gain,
            Tunable::TargetView => self.target_view,
            Tunable::ConfidenceThreshold => self.confidence_threshold
        }
    }

    /// Return a copy of this configuration with one tunable changed.
    ///
    /// The returned configuration has been validated.
    pub fn with_tunable(&self, tunable: Tunable, value: f64) -> Result<Self, ConfigError> {
        let mut cfg = self.clone();

        match tunable {
            Tunable::SpeedGain => cfg.speed_gain = value,
            Tunable::SteeringGain => cfg.steering_gain = value,
            Tunable::SteeringDgain => cfg.steering_dgain = value,
            Tunable::SteeringBias => cfg.steering_bias = value,
            Tunable::SpeedDev => cfg.speed_dev = value,
            Tunable::TurnGain => cfg.turn_gain = value,
            Tunable::TargetView => cfg.target_view = value,
            Tunable::ConfidenceThreshold => cfg.confidence_threshold = value
        }

        cfg.validate()?;

        Ok(cfg)
    }
}

impl Tunable {
    pub const ALL: [Tunable; 8] = [
        Tunable::SpeedGain,
        Tunable::SteeringGain,
        Tunable::SteeringDgain,
        Tunable::SteeringBias,
        Tunable::SpeedDev,
        Tunable::TurnGain,
        Tunable::TargetView,
        Tunable::ConfidenceThreshold
    ];

    /// The name of the tunable as it appears in parameter files and telecommands.
    pub fn name(&self) -> &'static str {
        match self {
            Tunable::SpeedGain => "speed_gain",
            Tunable::SteeringGain => "steering_gain",
            Tunable::SteeringDgain => "steering_dgain",
            Tunable::SteeringBias => "steering_bias",
            Tunable::SpeedDev => "speed_dev",
            Tunable::TurnGain => "turn_gain",
            Tunable::TargetView => "target_view",
            Tunable::ConfidenceThreshold => "confidence_threshold"
        }
    }
}

impl FromStr for Tunable {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tunable::ALL
            .iter()
            .find(|t| t.name() == s)
            .copied()
            .ok_or_else(|| ConfigError::UnknownTunable(s.to_string()))
    }
}
