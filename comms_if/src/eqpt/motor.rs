//! # Motor Equipment Demands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Demands sent to the differential-drive motors.
///
/// Both values are normalised rates in the range [-1, 1], where positive drives the wheel
/// forwards.
#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, PartialEq)]
pub struct MotorDems {
    /// Left wheel demand
    pub left: f64,

    /// Right wheel demand
    pub right: f64
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MotorDems {
    /// The stop command, always accepted by the motors.
    pub const STOP: MotorDems = MotorDems { left: 0.0, right: 0.0 };

    /// Mix a forward speed and a steering demand into left and right wheel demands.
    ///
    /// Positive steering turns the robot to the right (left wheel faster). Each wheel is
    /// saturated to [-1, 1].
    pub fn from_speed_steering(speed: f64, steering: f64) -> Self {
        Self {
            left: (speed + steering).clamp(-1.0, 1.0),
            right: (speed - steering).clamp(-1.0, 1.0)
        }
    }

    /// Returns true if this is a stop command.
    pub fn is_stop(&self) -> bool {
        self.left == 0.0 && self.right == 0.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mixing_saturates() {
        let dems = MotorDems::from_speed_steering(0.8, 0.5);
        assert_eq!(dems.left, 1.0);
        assert!((dems.right - 0.3).abs() < 1e-12);

        let dems = MotorDems::from_speed_steering(0.0, -1.0);
        assert_eq!(dems.left, -1.0);
        assert_eq!(dems.right, 1.0);
    }

    #[test]
    fn test_stop() {
        assert!(MotorDems::STOP.is_stop());
        assert!(MotorDems::default().is_stop());
        assert!(!MotorDems::from_speed_steering(0.1, 0.0).is_stop());
    }
}
