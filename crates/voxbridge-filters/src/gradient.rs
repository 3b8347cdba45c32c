//! Gradient magnitude.

use voxbridge_core::dispatch_scalar;
use voxbridge_core::manifest::PluginManifest;
use voxbridge_core::params::ParameterMap;
use voxbridge_core::plugin::{FilterOutput, FilterPlugin, OutputLayout, Request};
use voxbridge_core::volume::{TypedImage, VolumeMeta};
use voxbridge_core::PluginResult;

use crate::grid;

/// Finite-difference gradient magnitude, scaled by the voxel spacing.
///
/// Central differences inside the volume, one-sided differences on the
/// faces. Each component of a multi-component volume is treated as an
/// independent plane, and magnitudes are cast back into the input
/// element kind with saturation.
pub struct GradientMagnitude {
    manifest: PluginManifest,
}

impl GradientMagnitude {
    pub fn new() -> Self {
        let manifest = PluginManifest::new(
            "gradient_magnitude",
            "Utility",
            "Gradient magnitude",
            "Computes the magnitude of the intensity gradient using \
             finite differences, taking the voxel spacing into account. \
             Dimensions, spacing, and element kind of the volume are \
             unchanged.",
        );
        Self { manifest }
    }
}

impl Default for GradientMagnitude {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterPlugin for GradientMagnitude {
    fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    fn output_layout(&self, input: &VolumeMeta, _params: &ParameterMap) -> OutputLayout {
        OutputLayout::matching(input)
    }

    fn run(&self, request: &Request<'_>) -> PluginResult<FilterOutput> {
        let meta = *request.input.meta();
        let dims = meta.dims;
        let spacing = meta.spacing;
        let slices = (meta.components * dims[2]) as f32;

        dispatch_scalar!(meta.scalar, T => {
            let view = request.input.view::<T>()?;
            let planes = grid::split_components(&view);
            let mut results = Vec::with_capacity(planes.len());
            for (c, plane) in planes.iter().enumerate() {
                let mut magnitude = vec![0.0f32; plane.len()];
                for z in 0..dims[2] {
                    request.ctx.checkpoint()?;
                    for y in 0..dims[1] {
                        for x in 0..dims[0] {
                            let p = [x, y, z];
                            let mut sum = 0.0f32;
                            for axis in 0..3 {
                                let g = grid::axis_derivative(plane, dims, spacing, p, axis);
                                sum += g * g;
                            }
                            magnitude[grid::offset(dims, p)] = sum.sqrt();
                        }
                    }
                    let done = (c * dims[2] + z + 1) as f32;
                    request.ctx.progress(done / slices);
                }
                results.push(magnitude);
            }
            let merged = grid::merge_components::<T>(&results);
            Ok(FilterOutput::new(TypedImage::new(meta, merged)?.into_buffer()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use voxbridge_core::progress::{CancelToken, ExecContext, NullProgress};
    use voxbridge_core::scalar::ScalarKind;
    use voxbridge_core::volume::VolumeSource;

    #[test]
    fn test_uniform_volume_has_zero_gradient() {
        let plugin = GradientMagnitude::new();
        let samples = vec![90u8; 27];
        let meta = VolumeMeta::contiguous([3, 3, 3], ScalarKind::UInt8);
        let source = VolumeSource::new(meta, &samples).unwrap();
        let params = ParameterMap::from_defaults(&plugin.manifest().params);
        let sink = NullProgress;
        let ctx = ExecContext::new(&sink, CancelToken::new());
        let request = Request {
            input: &source,
            second_input: None,
            params: &params,
            seeds: &[],
            ctx: &ctx,
        };
        let output = plugin.run(&request).unwrap();
        assert_eq!(output.volume.bytes(), vec![0u8; 27]);
    }

    #[test]
    fn test_ramp_gradient_accounts_for_spacing() {
        let plugin = GradientMagnitude::new();
        // f(x) = 10x along a 4-voxel row with 0.5 mm spacing, so the
        // physical slope is 20 everywhere, faces included.
        let samples: Vec<i16> = (0..4).map(|x| 10 * x).collect();
        let meta = VolumeMeta::new(
            [4, 1, 1],
            [0.5, 1.0, 1.0],
            [0.0; 3],
            ScalarKind::Int16,
            1,
        );
        let source = VolumeSource::new(meta, bytemuck::cast_slice(&samples)).unwrap();
        let params = ParameterMap::from_defaults(&plugin.manifest().params);
        let sink = NullProgress;
        let ctx = ExecContext::new(&sink, CancelToken::new());
        let request = Request {
            input: &source,
            second_input: None,
            params: &params,
            seeds: &[],
            ctx: &ctx,
        };
        let output = plugin.run(&request).unwrap();
        let out: &[i16] = bytemuck::cast_slice(output.volume.bytes());
        assert_eq!(out, &[20, 20, 20, 20]);
    }

    #[test]
    fn test_declares_no_parameters() {
        let plugin = GradientMagnitude::new();
        assert!(plugin.manifest().params.is_empty());
        assert_eq!(plugin.manifest().per_voxel_memory, 0);
    }
}
