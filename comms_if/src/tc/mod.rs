//! # Telecommand module
//!
//! This module provides the telecommands used to operate the cruise controller, whether they
//! come from a script or an operator.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod cruise;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Serialize, Deserialize};
use thiserror::Error;

// Internal
pub use cruise::{ConfigError, CruiseConfig, Tunable};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand.
///
/// Telecommands are serialised as JSON objects of the form
/// `{"type": "TUNE", "payload": {"name": "speed_gain", "value": 0.3}}`. Commands without data
/// omit the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tc {
    /// Start cruising
    Start,

    /// Stop cruising, the motors are brought to a halt
    Stop,

    /// Replace the whole cruise configuration
    SetConfig(CruiseConfig),

    /// Change one named tunable of the current configuration
    Tune {
        name: String,
        value: f64
    },

    /// Select the label to follow in fleet mode, `None` follows only the road
    Track {
        label: Option<u32>
    },

    /// Stop cruising and exit the executable
    Shutdown
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {

    /// Parse a new TC from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        serde_json::from_str(json_str).map_err(TcParseError::InvalidJson)
    }

    /// Serialise the TC into a JSON packet
    pub fn to_json(&self) -> Result<String, TcParseError> {
        serde_json::to_string(self).map_err(TcParseError::InvalidJson)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_tcs() {
        assert_eq!(Tc::from_json(r#"{"type": "START"}"#).unwrap(), Tc::Start);
        assert_eq!(Tc::from_json(r#"{"type": "STOP"}"#).unwrap(), Tc::Stop);

        assert_eq!(
            Tc::from_json(
                r#"{"type": "TUNE", "payload": {"name": "turn_gain", "value": 0.6}}"#
            ).unwrap(),
            Tc::Tune { name: "turn_gain".into(), value: 0.6 }
        );

        assert_eq!(
            Tc::from_json(r#"{"type": "TRACK", "payload": {"label": 1}}"#).unwrap(),
            Tc::Track { label: Some(1) }
        );
        assert_eq!(
            Tc::from_json(r#"{"type": "TRACK", "payload": {"label": null}}"#).unwrap(),
            Tc::Track { label: None }
        );
    }

    #[test]
    fn test_set_config_round_trip() {
        let tc = Tc::SetConfig(CruiseConfig::default());
        let json = tc.to_json().unwrap();
        assert_eq!(Tc::from_json(&json).unwrap(), tc);
    }

    #[test]
    fn test_reject_unknown() {
        assert!(Tc::from_json(r#"{"type": "MNVR"}"#).is_err());
        assert!(Tc::from_json("not json").is_err());
    }
}
