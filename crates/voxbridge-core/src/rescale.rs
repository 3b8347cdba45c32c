//! Linear rescaling and saturating casts for pipeline outputs.
//!
//! Pipelines that run in working precision have two ways back into the
//! host's element kind: a [`LinearRescale`] that maps a source window
//! onto an output range, or a direct saturating cast. Both round to the
//! nearest integer with ties away from zero when the target kind is an
//! integer (see [`Scalar::from_f64_clamped`]).

use crate::scalar::Scalar;

/// A linear intensity mapping from a source window onto an output
/// range.
///
/// Window endpoints map exactly onto the output endpoints; values
/// outside the window clamp to the corresponding end. A degenerate
/// window (both endpoints equal) maps everything to the lower output
/// value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearRescale {
    window_min: f64,
    window_max: f64,
    out_min: f64,
    out_max: f64,
}

impl LinearRescale {
    /// Maps `[window.0, window.1]` onto `[output.0, output.1]`.
    ///
    /// The output range may be inverted to flip intensities.
    pub fn new(window: (f64, f64), output: (f64, f64)) -> Self {
        Self {
            window_min: window.0,
            window_max: window.1,
            out_min: output.0,
            out_max: output.1,
        }
    }

    /// Builds the window from the observed finite extrema of `data`.
    ///
    /// A constant image yields a degenerate window.
    pub fn from_observed(data: &[f32], output: (f64, f64)) -> Self {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &v in data {
            if !v.is_finite() {
                continue;
            }
            let v = v as f64;
            if v < min {
                min = v;
            }
            if v > max {
                max = v;
            }
        }
        if min > max {
            min = 0.0;
            max = 0.0;
        }
        Self::new((min, max), output)
    }

    /// The source window `(min, max)`.
    pub fn window(&self) -> (f64, f64) {
        (self.window_min, self.window_max)
    }

    /// Applies the mapping to one value.
    pub fn apply(&self, v: f64) -> f64 {
        if !(self.window_max > self.window_min) {
            return self.out_min;
        }
        // Endpoints return the exact output bounds, so repeated
        // rescales cannot creep.
        if v <= self.window_min {
            return self.out_min;
        }
        if v >= self.window_max {
            return self.out_max;
        }
        let t = (v - self.window_min) / (self.window_max - self.window_min);
        let mapped = self.out_min + t * (self.out_max - self.out_min);
        let (lo, hi) = if self.out_min <= self.out_max {
            (self.out_min, self.out_max)
        } else {
            (self.out_max, self.out_min)
        };
        mapped.clamp(lo, hi)
    }

    /// Rescales a whole working slice into the target element kind.
    pub fn map_slice<T: Scalar>(&self, src: &[f32]) -> Vec<T> {
        src.iter()
            .map(|&v| T::from_f64_clamped(self.apply(v as f64)))
            .collect()
    }
}

/// Casts a working slice directly into the target kind, saturating at
/// its representable range.
pub fn cast_slice_clamped<T: Scalar>(src: &[f32]) -> Vec<T> {
    src.iter().map(|&v| T::from_f32_clamped(v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_window_endpoints_map_exactly() {
        let r = LinearRescale::new((0.1, 0.7), (0.0, 255.0));
        assert_eq!(r.apply(0.1), 0.0);
        assert_eq!(r.apply(0.7), 255.0);
        let r = LinearRescale::new((-100.0, 300.0), (10.0, 20.0));
        assert_eq!(r.apply(-100.0), 10.0);
        assert_eq!(r.apply(300.0), 20.0);
        assert_eq!(r.apply(100.0), 15.0);
    }

    #[test]
    fn test_values_outside_window_clamp() {
        let r = LinearRescale::new((0.0, 10.0), (0.0, 100.0));
        assert_eq!(r.apply(-3.0), 0.0);
        assert_eq!(r.apply(42.0), 100.0);
    }

    #[test]
    fn test_degenerate_window_maps_to_lower_output() {
        let r = LinearRescale::new((5.0, 5.0), (0.0, 255.0));
        assert_eq!(r.apply(5.0), 0.0);
        assert_eq!(r.apply(17.0), 0.0);
    }

    #[test]
    fn test_inverted_output_range() {
        let r = LinearRescale::new((0.0, 10.0), (255.0, 0.0));
        assert_eq!(r.apply(0.0), 255.0);
        assert_eq!(r.apply(10.0), 0.0);
        assert_eq!(r.apply(5.0), 127.5);
    }

    #[test]
    fn test_from_observed_spans_the_data() {
        let data = [0.25f32, -1.5, 3.0, f32::NAN, 2.0];
        let r = LinearRescale::from_observed(&data, (0.0, 255.0));
        assert_eq!(r.window(), (-1.5, 3.0));
        assert_eq!(r.apply(-1.5), 0.0);
        assert_eq!(r.apply(3.0), 255.0);
    }

    #[test]
    fn test_map_slice_rounds_and_saturates() {
        let r = LinearRescale::new((0.0, 2.0), (0.0, 255.0));
        let out: Vec<u8> = r.map_slice(&[0.0, 1.0, 2.0, 5.0, -1.0]);
        // 1.0 maps to 127.5, which rounds away from zero to 128.
        assert_eq!(out, vec![0, 128, 255, 255, 0]);
    }

    #[test]
    fn test_cast_slice_clamps_to_target_range() {
        let out: Vec<u8> = cast_slice_clamped(&[-5.0, 0.4, 0.5, 254.6, 300.0]);
        assert_eq!(out, vec![0, 0, 1, 255, 255]);
        let out: Vec<i16> = cast_slice_clamped(&[-1e9, -2.5, 7.5, 1e9]);
        assert_eq!(out, vec![i16::MIN, -3, 8, i16::MAX]);
    }
}
