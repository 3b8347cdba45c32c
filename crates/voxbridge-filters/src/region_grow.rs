//! Confidence-connected region growing.

use std::collections::VecDeque;

use voxbridge_core::composite::interleave_pair;
use voxbridge_core::dispatch_scalar;
use voxbridge_core::manifest::{Capabilities, PluginManifest};
use voxbridge_core::params::{ParamSpec, ParameterMap};
use voxbridge_core::plugin::{FilterOutput, FilterPlugin, OutputLayout, Request};
use voxbridge_core::runner::{IterativePipeline, PipelineRunner, RunLimits};
use voxbridge_core::scalar::{Scalar, ScalarKind};
use voxbridge_core::seed::SeedPoint;
use voxbridge_core::volume::{TypedImage, VolumeMeta};
use voxbridge_core::PluginResult;

use crate::grid;

/// Region growing with a confidence interval acceptance criterion.
///
/// Statistics start from cubic neighborhoods around the seeds; voxels
/// whose intensity falls within mean plus or minus `multiplier` times
/// the standard deviation join the region through 6-connected growth.
/// Each refinement round recomputes the statistics over the current
/// region and grows again, until the region is stable or the round
/// budget runs out.
pub struct ConfidenceConnected {
    manifest: PluginManifest,
}

impl ConfidenceConnected {
    pub fn new() -> Self {
        let manifest = PluginManifest::new(
            "confidence_connected",
            "Segmentation - Region Growing",
            "Confidence connected segmentation",
            "Grows a region from the seed points, accepting voxels \
             whose intensity lies inside an interval around the mean of \
             the region. The interval extent is the product of the \
             standard deviation and a user multiplier. The output is a \
             binary mask holding the replace value inside the region; \
             composite mode interleaves the original intensity with the \
             mask into a two-component volume.",
        )
        .with_capabilities(Capabilities {
            requires_seeds: true,
            single_component_only: true,
            ..Capabilities::default()
        })
        .with_per_voxel_memory(1)
        .with_params(vec![
            ParamSpec::int("iterations", 5),
            ParamSpec::float("multiplier", 2.5),
            ParamSpec::int("replace_value", 255),
            ParamSpec::int("initial_radius", 2),
            ParamSpec::flag("composite_output", false),
        ]);
        Self { manifest }
    }
}

impl Default for ConfidenceConnected {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterPlugin for ConfidenceConnected {
    fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    fn output_layout(&self, input: &VolumeMeta, params: &ParameterMap) -> OutputLayout {
        if params.flag("composite_output").unwrap_or(false) {
            OutputLayout::new(input.scalar, 2)
        } else {
            OutputLayout::mask()
        }
    }

    fn per_voxel_memory(&self, _input: &VolumeMeta, params: &ParameterMap) -> usize {
        if params.flag("composite_output").unwrap_or(false) {
            2
        } else {
            self.manifest.per_voxel_memory
        }
    }

    fn run(&self, request: &Request<'_>) -> PluginResult<FilterOutput> {
        let params = request.params;
        let iterations = params.int("iterations")?.clamp(0, u32::MAX as i64) as u32;
        let multiplier = params.float("multiplier")?;
        let replace_value = params.int("replace_value")?.clamp(0, 255) as u8;
        let radius = params.int("initial_radius")?.max(0) as usize;
        let composite = params.flag("composite_output")?;
        let meta = *request.input.meta();

        dispatch_scalar!(meta.scalar, T => {
            let view = request.input.view::<T>()?;
            let values: Vec<f64> = view.data.iter().map(|&v| v.to_f64()).collect();

            request.ctx.checkpoint()?;
            let (mean, sigma) =
                seed_neighborhood_stats(&values, meta.dims, request.seeds, radius);
            request.ctx.progress(0.05);

            let mask = flood(
                &values,
                meta.dims,
                request.seeds,
                mean - multiplier * sigma,
                mean + multiplier * sigma,
            );
            request.ctx.progress(0.2);

            let refinement = RegionRefinement {
                values: &values,
                dims: meta.dims,
                seeds: request.seeds,
                multiplier,
                mask,
            };
            let mut runner = PipelineRunner::new(refinement, RunLimits::iterations(iterations))
                .with_progress_window(0.2, 1.0);
            let run = runner.run(request.ctx)?;
            let mask = runner.into_pipeline().mask;

            let mask_bytes: Vec<u8> = mask
                .iter()
                .map(|&inside| if inside { replace_value } else { 0 })
                .collect();
            let staged = if composite {
                interleave_pair(view, &mask_bytes)?.into_buffer()
            } else {
                TypedImage::new(meta.with_layout(ScalarKind::UInt8, 1), mask_bytes)?
                    .into_buffer()
            };
            Ok(FilterOutput::new(staged).with_run(run))
        })
    }
}

/// One refinement round: recompute statistics over the region, then
/// regrow from the seeds.
struct RegionRefinement<'a> {
    values: &'a [f64],
    dims: [usize; 3],
    seeds: &'a [SeedPoint],
    multiplier: f64,
    mask: Vec<bool>,
}

impl IterativePipeline for RegionRefinement<'_> {
    fn step(&mut self) -> PluginResult<f64> {
        let Some((mean, sigma)) = region_stats(self.values, &self.mask) else {
            // Nothing was segmented; the region is trivially stable.
            return Ok(0.0);
        };
        let next = flood(
            self.values,
            self.dims,
            self.seeds,
            mean - self.multiplier * sigma,
            mean + self.multiplier * sigma,
        );
        let changed = next
            .iter()
            .zip(&self.mask)
            .filter(|(a, b)| a != b)
            .count();
        let fraction = changed as f64 / self.mask.len() as f64;
        self.mask = next;
        Ok(fraction)
    }
}

/// Mean and standard deviation over cubic neighborhoods of the seeds,
/// clipped at the volume faces.
fn seed_neighborhood_stats(
    values: &[f64],
    dims: [usize; 3],
    seeds: &[SeedPoint],
    radius: usize,
) -> (f64, f64) {
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut count = 0usize;
    for seed in seeds {
        let lo = [
            seed.index[0].saturating_sub(radius),
            seed.index[1].saturating_sub(radius),
            seed.index[2].saturating_sub(radius),
        ];
        let hi = [
            (seed.index[0] + radius).min(dims[0] - 1),
            (seed.index[1] + radius).min(dims[1] - 1),
            (seed.index[2] + radius).min(dims[2] - 1),
        ];
        for z in lo[2]..=hi[2] {
            for y in lo[1]..=hi[1] {
                for x in lo[0]..=hi[0] {
                    let v = values[grid::offset(dims, [x, y, z])];
                    sum += v;
                    sum_sq += v * v;
                    count += 1;
                }
            }
        }
    }
    finish_stats(sum, sum_sq, count)
}

/// Mean and standard deviation over the segmented voxels, if any.
fn region_stats(values: &[f64], mask: &[bool]) -> Option<(f64, f64)> {
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut count = 0usize;
    for (v, &inside) in values.iter().zip(mask) {
        if inside {
            sum += v;
            sum_sq += v * v;
            count += 1;
        }
    }
    if count == 0 {
        return None;
    }
    Some(finish_stats(sum, sum_sq, count))
}

fn finish_stats(sum: f64, sum_sq: f64, count: usize) -> (f64, f64) {
    let n = count.max(1) as f64;
    let mean = sum / n;
    let variance = (sum_sq / n - mean * mean).max(0.0);
    (mean, variance.sqrt())
}

/// 6-connected growth from the seeds over the acceptance interval.
fn flood(
    values: &[f64],
    dims: [usize; 3],
    seeds: &[SeedPoint],
    lo: f64,
    hi: f64,
) -> Vec<bool> {
    let mut mask = vec![false; values.len()];
    let mut queue = VecDeque::new();
    for seed in seeds {
        let i = grid::offset(dims, seed.index);
        if !mask[i] && values[i] >= lo && values[i] <= hi {
            mask[i] = true;
            queue.push_back(seed.index);
        }
    }
    while let Some(p) = queue.pop_front() {
        grid::visit_face_neighbors(dims, p, |q| {
            let i = grid::offset(dims, q);
            if !mask[i] && values[i] >= lo && values[i] <= hi {
                mask[i] = true;
                queue.push_back(q);
            }
        });
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use voxbridge_core::progress::{CancelToken, ExecContext, NullProgress};
    use voxbridge_core::runner::Completion;
    use voxbridge_core::volume::VolumeSource;

    /// Six-voxel row, dark left half and bright right half.
    fn split_row() -> Vec<i16> {
        vec![10, 10, 10, 200, 200, 200]
    }

    fn run_region(
        samples: &[i16],
        seeds: &[SeedPoint],
        raw: &[(&str, &str)],
    ) -> FilterOutput {
        let plugin = ConfidenceConnected::new();
        let meta = VolumeMeta::contiguous([samples.len(), 1, 1], ScalarKind::Int16);
        let source = VolumeSource::new(meta, bytemuck::cast_slice(samples)).unwrap();
        let raw: Vec<(String, String)> = raw
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let params = ParameterMap::from_raw(&plugin.manifest().params, &raw).unwrap();
        let sink = NullProgress;
        let ctx = ExecContext::new(&sink, CancelToken::new());
        let request = Request {
            input: &source,
            second_input: None,
            params: &params,
            seeds,
            ctx: &ctx,
        };
        plugin.run(&request).unwrap()
    }

    #[test]
    fn test_uniform_side_grows_to_its_edge_and_stops() {
        let output = run_region(
            &split_row(),
            &[SeedPoint::new([1, 0, 0])],
            &[("initial_radius", "1")],
        );
        assert_eq!(output.volume.bytes(), &[255, 255, 255, 0, 0, 0]);
        let run = output.run.unwrap();
        assert_eq!(run.completion, Completion::Converged);
    }

    #[test]
    fn test_replace_value_fills_the_mask() {
        let output = run_region(
            &split_row(),
            &[SeedPoint::new([1, 0, 0])],
            &[("initial_radius", "1"), ("replace_value", "7")],
        );
        assert_eq!(output.volume.bytes(), &[7, 7, 7, 0, 0, 0]);
    }

    #[test]
    fn test_composite_output_interleaves_intensity_and_mask() {
        let output = run_region(
            &split_row(),
            &[SeedPoint::new([1, 0, 0])],
            &[("initial_radius", "1"), ("composite_output", "1")],
        );
        let meta = output.volume.meta();
        assert_eq!(meta.scalar, ScalarKind::Int16);
        assert_eq!(meta.components, 2);
        let samples: &[i16] = bytemuck::cast_slice(output.volume.bytes());
        assert_eq!(samples, &[10, 255, 10, 255, 10, 255, 200, 0, 200, 0, 200, 0]);
    }

    #[test]
    fn test_layout_switches_with_composite_flag() {
        let plugin = ConfidenceConnected::new();
        let meta = VolumeMeta::contiguous([4, 4, 4], ScalarKind::Float64);
        let mut params = ParameterMap::from_defaults(&plugin.manifest().params);
        assert_eq!(plugin.output_layout(&meta, &params), OutputLayout::mask());
        assert_eq!(plugin.per_voxel_memory(&meta, &params), 1);
        params.set("composite_output", voxbridge_core::ParamValue::Bool(true));
        assert_eq!(
            plugin.output_layout(&meta, &params),
            OutputLayout::new(ScalarKind::Float64, 2)
        );
        assert_eq!(plugin.per_voxel_memory(&meta, &params), 2);
    }
}
