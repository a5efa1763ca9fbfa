//! Angle and binning helpers for the geometric voter.

/// Wraps an angle in degrees to the range [0, 360).
pub(crate) fn wrap_deg_positive(angle_deg: f32) -> f32 {
    let wrapped = angle_deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Quantizes a positive ratio into logarithmic bins of `increment`.
///
/// A ratio of 1 maps to bin 0, `increment` to bin 1, `1 / increment` to -1.
pub(crate) fn log_bin(ratio: f32, increment: f32) -> i32 {
    let bin = (ratio.ln() / increment.ln()).round();
    bin.clamp(i32::MIN as f32, i32::MAX as f32) as i32
}

/// Quantizes an angle in [0, 360) into `bins` equal-width bins.
pub(crate) fn angle_bin(angle_deg: f32, bins: usize) -> usize {
    debug_assert!(bins > 0);
    let width = 360.0 / bins as f32;
    let idx = (angle_deg / width).floor() as usize;
    idx.min(bins - 1)
}

/// Circular distance between two bin indices on a ring of `bins` bins.
pub(crate) fn circular_bin_distance(a: usize, b: usize, bins: usize) -> usize {
    let diff = a.max(b) - a.min(b);
    diff.min(bins - diff)
}

#[cfg(test)]
mod tests {
    use super::{angle_bin, circular_bin_distance, log_bin, wrap_deg_positive};

    #[test]
    fn wrap_deg_positive_maps_to_expected_range() {
        assert!((wrap_deg_positive(-10.0) - 350.0).abs() < 1e-4);
        assert!((wrap_deg_positive(370.0) - 10.0).abs() < 1e-4);
        assert_eq!(wrap_deg_positive(0.0), 0.0);
        assert!(wrap_deg_positive(-1e-9) < 360.0);
    }

    #[test]
    fn log_bin_centers_unit_ratio() {
        assert_eq!(log_bin(1.0, 1.5), 0);
        assert_eq!(log_bin(1.5, 1.5), 1);
        assert_eq!(log_bin(1.0 / 1.5, 1.5), -1);
        assert_eq!(log_bin(2.25, 1.5), 2);
        assert_eq!(log_bin(1.1, 1.5), 0);
    }

    #[test]
    fn angle_bin_splits_circle_evenly() {
        assert_eq!(angle_bin(0.0, 10), 0);
        assert_eq!(angle_bin(35.9, 10), 0);
        assert_eq!(angle_bin(36.0, 10), 1);
        assert_eq!(angle_bin(359.9, 10), 9);
    }

    #[test]
    fn circular_distance_wraps() {
        assert_eq!(circular_bin_distance(0, 9, 10), 1);
        assert_eq!(circular_bin_distance(2, 5, 10), 3);
        assert_eq!(circular_bin_distance(4, 4, 10), 0);
    }
}
