//! General time utility functions

use chrono::{DateTime, Utc};

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Seconds elapsed between two timestamps, negative if `later` is actually earlier.
pub fn seconds_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> Option<f64> {
    duration_to_seconds(later.signed_duration_since(earlier))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_seconds_between() {
        let t0 = Utc::now();
        let t1 = t0 + chrono::Duration::milliseconds(250);

        assert_eq!(seconds_between(t0, t1), Some(0.25));
        assert_eq!(seconds_between(t1, t0), Some(-0.25));
    }
}
