//! Linear windowing and saturating casts at the output boundary.
//!
//! Values leaving a pipeline are either mapped through a linear
//! window or cast saturating into the output element type. Rounding
//! is to nearest with ties away from zero; out-of-range values pin to
//! the type bounds and NaN becomes zero.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p voxbridge-tests --test rescale_cast
//! ```

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use voxbridge_core::{
    cast_slice_clamped, invoke, InvokeStatus, Invocation, LinearRescale, Scalar, ScalarKind,
    VolumeMeta, VolumeSink, VolumeSource,
};
use voxbridge_filters::IntensityWindowing;
use voxbridge_tests::raw_params;

#[test]
fn test_window_maps_and_rounds_through_the_seam() {
    let samples: Vec<u16> = vec![0, 250, 500, 1000, 1200];
    let meta = VolumeMeta::contiguous([5, 1, 1], ScalarKind::UInt16);
    let source = VolumeSource::new(meta, bytemuck::cast_slice(&samples)).unwrap();
    let plugin = IntensityWindowing::new();

    let invocation = Invocation::new(source).with_raw_params(raw_params(&[
        ("window_minimum", "0"),
        ("window_maximum", "1000"),
        ("output_minimum", "0"),
        ("output_maximum", "255"),
    ]));
    let mut out = vec![0u16; 5];
    let mut sink = VolumeSink::new(meta, bytemuck::cast_slice_mut(&mut out)).unwrap();

    let report = invoke(&plugin, &invocation, &mut sink);
    assert_eq!(report.status, InvokeStatus::Success);
    // 250 -> 63.75 rounds up; 500 -> 127.5 ties away from zero;
    // 1200 clamps at the window top.
    assert_eq!(out, vec![0, 64, 128, 255, 255]);
}

#[test]
fn test_negative_ties_round_away_from_zero() {
    let rescale = LinearRescale::new((0.0, 10.0), (-5.0, 5.0));
    let mapped: Vec<i8> = rescale.map_slice(&[4.5, 5.5, 0.0, 10.0]);
    assert_eq!(mapped, vec![-1, 1, -5, 5]);
}

#[test]
fn test_values_outside_the_window_clamp_to_output_bounds() {
    let rescale = LinearRescale::new((100.0, 200.0), (10.0, 20.0));
    assert_eq!(rescale.apply(50.0), 10.0);
    assert_eq!(rescale.apply(100.0), 10.0);
    assert_eq!(rescale.apply(150.0), 15.0);
    assert_eq!(rescale.apply(200.0), 20.0);
    assert_eq!(rescale.apply(1e9), 20.0);
}

#[test]
fn test_degenerate_window_collapses_to_output_minimum() {
    let rescale = LinearRescale::new((128.0, 128.0), (0.0, 255.0));
    assert_eq!(rescale.apply(0.0), 0.0);
    assert_eq!(rescale.apply(128.0), 0.0);
    assert_eq!(rescale.apply(255.0), 0.0);
}

#[test]
fn test_saturating_cast_pins_to_type_bounds() {
    assert_eq!(i8::from_f64_clamped(300.0), 127);
    assert_eq!(i8::from_f64_clamped(-300.0), -128);
    assert_eq!(u8::from_f64_clamped(-5.0), 0);
    assert_eq!(u16::from_f64_clamped(1e9), u16::MAX);
    assert_eq!(u32::from_f64_clamped(4.3e9), u32::MAX);
    assert_eq!(i32::from_f64_clamped(f64::INFINITY), i32::MAX);
    assert_eq!(i32::from_f64_clamped(f64::NEG_INFINITY), i32::MIN);
    assert_eq!(i16::from_f64_clamped(f64::NAN), 0);
}

#[test]
fn test_float_outputs_keep_values_unclamped() {
    assert_eq!(f32::from_f64_clamped(1e12), 1e12f32);
    assert_eq!(f64::from_f64_clamped(-1e300), -1e300);
}

#[test]
fn test_cast_slice_clamped_handles_every_hazard_at_once() {
    let cast: Vec<u8> = cast_slice_clamped(&[-10.0, 0.0, 99.5, 300.0, f32::NAN]);
    assert_eq!(cast, vec![0, 0, 100, 255, 0]);
}

proptest! {
    /// Casting any f64 into i16 never panics and always pins.
    #[test]
    fn saturating_cast_is_total_for_i16(v in any::<f64>()) {
        let cast = i16::from_f64_clamped(v);
        if v.is_nan() {
            prop_assert_eq!(cast, 0);
        } else if v >= i16::MAX as f64 {
            prop_assert_eq!(cast, i16::MAX);
        } else if v <= i16::MIN as f64 {
            prop_assert_eq!(cast, i16::MIN);
        } else {
            prop_assert!((cast as f64 - v).abs() <= 0.5);
        }
    }

    /// Window endpoints always land on the output endpoints.
    #[test]
    fn window_endpoints_are_fixed_points(
        w0 in -1e4f64..1e4,
        width in 1e-3f64..1e4,
        o0 in -1e3f64..1e3,
        span in 1e-3f64..1e3,
    ) {
        let rescale = LinearRescale::new((w0, w0 + width), (o0, o0 + span));
        prop_assert!((rescale.apply(w0) - o0).abs() < 1e-9 * span.max(1.0));
        prop_assert!((rescale.apply(w0 + width) - (o0 + span)).abs() < 1e-9 * span.max(1.0));
    }

    /// The mapping never leaves the output range and never reverses
    /// order.
    #[test]
    fn window_mapping_is_monotone_and_bounded(
        a in -1e5f64..1e5,
        b in -1e5f64..1e5,
    ) {
        let rescale = LinearRescale::new((-100.0, 100.0), (0.0, 255.0));
        let (fa, fb) = (rescale.apply(a), rescale.apply(b));
        prop_assert!((0.0..=255.0).contains(&fa));
        prop_assert!((0.0..=255.0).contains(&fb));
        if a <= b {
            prop_assert!(fa <= fb);
        }
    }
}
