//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float,
{
    target_range.0
        + ((value - source_range.0) * (target_range.1 - target_range.0)
            / (source_range.1 - source_range.0))
}

/// Clamp a value into the range `[min, max]`.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T
where
    T: Float,
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Round a value to the given number of decimal places.
///
/// Used for reporting stability of errors and controller outputs, which are
/// quoted to two decimal places throughout the software.
pub fn round_dp<T>(value: T, dp: u32) -> T
where
    T: Float,
{
    let scale = T::from(10u32.pow(dp)).unwrap();
    (value * scale).round() / scale
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0f64, 1f64), (0f64, 10f64), 0.5), 5.0);
        assert_eq!(lin_map((-1f64, 1f64), (0f64, 1f64), 0.0), 0.5);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(&1.5f64, &-1.0, &1.0), 1.0);
        assert_eq!(clamp(&-1.5f64, &-1.0, &1.0), -1.0);
        assert_eq!(clamp(&0.3f64, &-1.0, &1.0), 0.3);
    }

    #[test]
    fn test_round_dp() {
        assert_eq!(round_dp(0.12345f64, 2), 0.12);
        assert_eq!(round_dp(-0.675f64, 2), -0.68);
        assert_eq!(round_dp(1.0f64, 2), 1.0);
    }
}
