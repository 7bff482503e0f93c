//! Conversions between integer counts and the floating-point quantities used
//! for densities, proportions, and penalties.
//!
//! Every proportion in the model resolves a zero denominator to `0.0` rather
//! than an error, and every float-to-count conversion saturates into the
//! `u32` range.

/// `numerator / denominator`, or `0.0` when either side is zero.
#[allow(clippy::cast_precision_loss)]
pub fn ratio(numerator: u64, denominator: u64) -> f64 {
    if numerator == 0 || denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

/// A `u64` count as `f64`.
#[allow(clippy::cast_precision_loss)]
pub const fn count_as_f64(count: u64) -> f64 {
    count as f64
}

/// Convert an already-rounded non-negative value into a count.
///
/// Negative values and NaN become `0`; values beyond `u32::MAX` saturate.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn to_count(value: f64) -> u32 {
    if value.is_nan() || value <= 0.0 {
        0
    } else if value >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        value as u32
    }
}

/// Round half away from zero into a count.
pub fn round_count(value: f64) -> u32 {
    to_count(value.round())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_denominator_is_zero() {
        assert!(ratio(5, 0).abs() < f64::EPSILON);
        assert!(ratio(0, 5).abs() < f64::EPSILON);
    }

    #[test]
    fn ratio_divides() {
        assert!((ratio(1, 4) - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn to_count_saturates() {
        assert_eq!(to_count(-3.0), 0);
        assert_eq!(to_count(f64::NAN), 0);
        assert_eq!(to_count(1e12), u32::MAX);
        assert_eq!(to_count(41.0), 41);
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_count(2.5), 3);
        assert_eq!(round_count(2.4999), 2);
        assert_eq!(round_count(0.5), 1);
    }
}
