//! Full region growing run over an anisotropic grid.
//!
//! Seeds arrive as physical markers, the volume has non-unit spacing
//! and a shifted origin, and the mask comes back through the seam
//! into host memory. A homogeneous bright box inside a darker
//! background must be segmented exactly.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p voxbridge-tests --test e2e_region_grow
//! ```

use pretty_assertions::assert_eq;

use voxbridge_core::{
    invoke, Completion, InvokeStatus, Invocation, ScalarKind, VolumeMeta, VolumeSink,
    VolumeSource,
};
use voxbridge_filters::FilterRegistry;
use voxbridge_tests::{raw_params, split_block};

const DIMS: [usize; 3] = [12, 10, 6];

fn boxed_volume() -> (VolumeMeta, Vec<u16>) {
    let meta = VolumeMeta::new(
        DIMS,
        [0.5, 0.5, 2.0],
        [-10.0, 4.0, 2.0],
        ScalarKind::UInt16,
        1,
    );
    let mut samples = vec![50u16; meta.voxel_count()];
    for z in 1..=4 {
        for y in 2..=7 {
            for x in 2..=6 {
                samples[meta.index_of([x, y, z])] = 900;
            }
        }
    }
    (meta, samples)
}

fn inside_box(p: [usize; 3]) -> bool {
    (2..=6).contains(&p[0]) && (2..=7).contains(&p[1]) && (1..=4).contains(&p[2])
}

#[test]
fn test_bright_box_is_segmented_exactly() {
    let (meta, samples) = boxed_volume();
    let registry = FilterRegistry::builtin();
    let plugin = registry.get("confidence_connected").unwrap();

    let source = VolumeSource::new(meta, bytemuck::cast_slice(&samples)).unwrap();
    // Physical position of grid index [4, 5, 2].
    let marker = [-8.0, 6.5, 6.0];
    let invocation = Invocation::new(source)
        .with_raw_params(raw_params(&[("initial_radius", "1")]))
        .with_markers(vec![marker]);

    let mask_meta = meta.with_layout(ScalarKind::UInt8, 1);
    let mut out = vec![0u8; mask_meta.voxel_count()];
    let mut sink = VolumeSink::new(mask_meta, &mut out).unwrap();
    let report = invoke(plugin, &invocation, &mut sink);

    assert_eq!(report.status, InvokeStatus::Success);
    let run = report.run.unwrap();
    assert_eq!(run.completion, Completion::Converged);

    let masked = out.iter().filter(|&&v| v == 255).count();
    assert_eq!(masked, 5 * 6 * 4);
    for z in 0..DIMS[2] {
        for y in 0..DIMS[1] {
            for x in 0..DIMS[0] {
                let expected = if inside_box([x, y, z]) { 255 } else { 0 };
                assert_eq!(out[meta.index_of([x, y, z])], expected, "at {:?}", [x, y, z]);
            }
        }
    }
}

#[test]
fn test_pooled_seeds_share_one_statistics_interval() {
    // Two seeds in the two halves pool their neighborhoods, so the
    // acceptance interval spans both intensities and the growth
    // covers the whole row.
    let samples = split_block::<i16>([6, 1, 1], 10, 200);
    let meta = VolumeMeta::contiguous([6, 1, 1], ScalarKind::Int16);
    let registry = FilterRegistry::builtin();
    let plugin = registry.get("confidence_connected").unwrap();

    let source = VolumeSource::new(meta, bytemuck::cast_slice(&samples)).unwrap();
    let invocation = Invocation::new(source)
        .with_raw_params(raw_params(&[("initial_radius", "1")]))
        .with_markers(vec![[1.0, 0.0, 0.0], [4.0, 0.0, 0.0]]);

    let mask_meta = meta.with_layout(ScalarKind::UInt8, 1);
    let mut out = vec![0u8; 6];
    let mut sink = VolumeSink::new(mask_meta, &mut out).unwrap();
    let report = invoke(plugin, &invocation, &mut sink);

    assert_eq!(report.status, InvokeStatus::Success);
    assert_eq!(out, vec![255; 6]);
}

#[test]
fn test_missing_markers_fail_before_processing() {
    let (meta, samples) = boxed_volume();
    let registry = FilterRegistry::builtin();
    let plugin = registry.get("confidence_connected").unwrap();

    let source = VolumeSource::new(meta, bytemuck::cast_slice(&samples)).unwrap();
    let invocation = Invocation::new(source);

    let mask_meta = meta.with_layout(ScalarKind::UInt8, 1);
    let mut out = vec![3u8; mask_meta.voxel_count()];
    let mut sink = VolumeSink::new(mask_meta, &mut out).unwrap();
    let report = invoke(plugin, &invocation, &mut sink);

    assert_eq!(report.status, InvokeStatus::Precondition);
    assert_eq!(report.error.unwrap().code, "VB_005");
    assert!(out.iter().all(|&b| b == 3));
}
