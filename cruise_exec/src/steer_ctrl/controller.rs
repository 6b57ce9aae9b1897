//! # Steering controllers

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;

// Internal
use comms_if::tc::CruiseConfig;
use util::maths::saturate;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Smallest time step used for the derivative, guards against duplicate frame timestamps.
///
/// Units: seconds
pub const MIN_DT_S: f64 = 1e-3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gains of the steering controller.
#[derive(Debug, Serialize, Copy, Clone, PartialEq)]
pub struct SteerGains {
    /// Proportional gain
    pub k_p: f64,

    /// Derivative gain
    pub k_d: f64,

    /// Constant offset added to the output
    pub bias: f64
}

/// A PD controller on the lateral offset of the target.
#[derive(Debug, Serialize, Clone)]
pub struct SteerCtrl {
    gains: SteerGains,

    /// Error passed in on the previous call
    prev_error: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl From<&CruiseConfig> for SteerGains {
    fn from(cfg: &CruiseConfig) -> Self {
        Self {
            k_p: cfg.steering_gain,
            k_d: cfg.steering_dgain,
            bias: cfg.steering_bias
        }
    }
}

impl SteerCtrl {

    /// Create a new controller with the given gains.
    pub fn new(gains: SteerGains) -> Self {
        Self {
            gains,
            prev_error: 0f64
        }
    }

    /// Replace the gains. The previous error is kept, so that retuning does not produce a
    /// derivative spike.
    pub fn set_gains(&mut self, gains: SteerGains) {
        self.gains = gains;
    }

    pub fn gains(&self) -> SteerGains {
        self.gains
    }

    /// The error used on the previous call to `compute`.
    pub fn prev_error(&self) -> f64 {
        self.prev_error
    }

    /// Forget the previous error.
    pub fn reset(&mut self) {
        self.prev_error = 0f64;
    }

    /// Set the previous error as if `target_x` had just been seen, so that the next call to
    /// `compute` has no derivative kick from a stale error.
    pub fn prime(&mut self, target_x: f64) {
        self.prev_error = saturate(target_x, 1.0);
    }

    /// Get the steering demand for the given lateral target offset.
    ///
    /// `dt_s` is the time elapsed since the previous call. The target is clamped to [-1, 1]
    /// before use and the output is saturated to [-1, 1].
    pub fn compute(&mut self, target_x: f64, dt_s: f64) -> f64 {
        let error = saturate(target_x, 1.0);

        let deriv = (error - self.prev_error) / dt_s.max(MIN_DT_S);

        let out = 
            self.gains.k_p * error 
            + self.gains.k_d * deriv
            + self.gains.bias;

        trace!(
            "SteerCtrl: err = {:.4}, deriv = {:.4}, raw = {:.4}", 
            error, deriv, out
        );

        self.prev_error = error;

        saturate(out, 1.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn gains(k_p: f64, k_d: f64, bias: f64) -> SteerGains {
        SteerGains { k_p, k_d, bias }
    }

    #[test]
    fn test_output_saturates() {
        let mut ctrl = SteerCtrl::new(gains(5.0, 2.0, 0.3));

        let mut x = -1.0;
        while x <= 1.0 {
            for dt in [1e-6, 0.01, 0.1, 1.0].iter() {
                let s = ctrl.compute(x, *dt);
                assert!(s >= -1.0 && s <= 1.0, "steering {} out of range", s);
            }
            x += 0.05;
        }
    }

    #[test]
    fn test_pure_p_steady_state() {
        let g = 0.3;
        let t = 0.4;
        let mut ctrl = SteerCtrl::new(gains(g, 0.0, 0.0));

        for _ in 0..20 {
            assert!((ctrl.compute(t, 0.1) - g * t).abs() < 1e-12);
        }
    }

    #[test]
    fn test_derivative_kick_then_settle() {
        let mut ctrl = SteerCtrl::new(gains(0.08, 0.82, -0.01));

        // 0.08 * 0.5 + 0.82 * (0.5 / 0.1) - 0.01 = 4.13, saturated
        assert_eq!(ctrl.compute(0.5, 0.1), 1.0);

        for _ in 0..4 {
            assert!((ctrl.compute(0.5, 0.1) - 0.03).abs() < 1e-12);
        }
    }

    #[test]
    fn test_tiny_dt_is_guarded() {
        let mut ctrl = SteerCtrl::new(gains(0.0, 1e-4, 0.0));

        // With dt = 0 the derivative uses MIN_DT_S: 1e-4 * 0.5 / 1e-3 = 0.05
        let s = ctrl.compute(0.5, 0.0);
        assert!(s.is_finite());
        assert!((s - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_target_clamped_and_reset() {
        let mut ctrl = SteerCtrl::new(gains(0.5, 0.0, 0.0));

        assert!((ctrl.compute(3.0, 0.1) - 0.5).abs() < 1e-12);
        assert_eq!(ctrl.prev_error(), 1.0);

        ctrl.reset();
        assert_eq!(ctrl.prev_error(), 0.0);
    }

    #[test]
    fn test_prime_removes_kick() {
        let mut ctrl = SteerCtrl::new(gains(0.1, 0.5, 0.0));
        ctrl.prime(-0.4);

        assert!((ctrl.compute(-0.4, 0.1) + 0.04).abs() < 1e-12);
    }
}
