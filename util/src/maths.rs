//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where 
    T: Float 
{
    target_range.0 
        + ((value - source_range.0) 
        * (target_range.1 - target_range.0) 
        / (source_range.1 - source_range.0))
}

/// Saturate a value into `[-limit, limit]`.
///
/// NaN inputs saturate to zero so that they can never reach an actuator.
pub fn saturate<T>(value: T, limit: T) -> T
where
    T: Float
{
    if value.is_nan() {
        return T::zero()
    }

    value.max(-limit).min(limit)
}

/// Clamp a value into the unit interval `[0, 1]`.
pub fn clamp_unit<T>(value: T) -> T
where
    T: Float
{
    if value.is_nan() {
        return T::zero()
    }

    value.max(T::zero()).min(T::one())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0f64, 1f64), (-1f64, 1f64), 0.5), 0.0);
        assert_eq!(lin_map((0f64, 1f64), (-1f64, 1f64), 0.0), -1.0);
        assert_eq!(lin_map((0f64, 1f64), (-1f64, 1f64), 1.0), 1.0);
        assert_eq!(lin_map((0f64, 1f64), (-1f64, 1f64), 0.75), 0.5);
    }

    #[test]
    fn test_saturate() {
        assert_eq!(saturate(4.13f64, 1.0), 1.0);
        assert_eq!(saturate(-2f64, 1.0), -1.0);
        assert_eq!(saturate(0.3f64, 1.0), 0.3);
        assert_eq!(saturate(f64::NAN, 1.0), 0.0);
    }

    #[test]
    fn test_clamp_unit() {
        assert_eq!(clamp_unit(1.2f64), 1.0);
        assert_eq!(clamp_unit(-0.2f64), 0.0);
        assert_eq!(clamp_unit(0.4f64), 0.4);
    }
}
