//! Sigmoid intensity transform.

use voxbridge_core::dispatch_scalar;
use voxbridge_core::manifest::{Capabilities, PluginManifest};
use voxbridge_core::params::{ParamSpec, ParameterMap};
use voxbridge_core::plugin::{FilterOutput, FilterPlugin, OutputLayout, Request};
use voxbridge_core::scalar::Scalar;
use voxbridge_core::volume::{TypedImage, VolumeMeta};
use voxbridge_core::PluginResult;

/// Pixel-wise sigmoid transform.
///
/// `alpha` and `beta` arrive normalized against the observed input
/// range `[lower, upper]` and are denormalized before evaluation:
///
/// ```text
/// alpha = alpha_norm * (upper - lower)
/// beta  = (1 + beta_norm) / 2 * upper + (1 - beta_norm) / 2 * lower
/// out   = out_min + (out_max - out_min) / (1 + exp(-(v - beta) / alpha))
/// ```
///
/// The output bounds are cast into the input element kind first, so
/// the whole response stays representable.
pub struct Sigmoid {
    manifest: PluginManifest,
}

impl Sigmoid {
    pub fn new() -> Self {
        let manifest = PluginManifest::new(
            "sigmoid",
            "Intensity Transformation",
            "Sigmoid intensity transform",
            "Applies a pixel-wise sigmoid intensity transform. The alpha \
             and beta parameters are normalized against the observed \
             intensity range of the input: alpha controls the width of \
             the transition and beta its center. Dimensions, spacing, \
             and element kind of the volume are unchanged.",
        )
        .with_capabilities(Capabilities {
            pieces: true,
            ..Capabilities::default()
        })
        .with_params(vec![
            ParamSpec::float("alpha", 5.0),
            ParamSpec::float("beta", 0.0),
            ParamSpec::float("output_minimum", 0.0),
            ParamSpec::float("output_maximum", 255.0),
        ]);
        Self { manifest }
    }
}

impl Default for Sigmoid {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterPlugin for Sigmoid {
    fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    fn output_layout(&self, input: &VolumeMeta, _params: &ParameterMap) -> OutputLayout {
        OutputLayout::matching(input)
    }

    fn run(&self, request: &Request<'_>) -> PluginResult<FilterOutput> {
        let params = request.params;
        let alpha_norm = params.float("alpha")?;
        let beta_norm = params.float("beta")?;
        let (lower, upper) = request.input.value_range()?;

        let mut alpha = alpha_norm * (upper - lower);
        if alpha == 0.0 {
            // Constant input or zero alpha: fall back to a unit slope
            // so the response stays finite.
            alpha = 1.0;
        }
        let beta = (1.0 + beta_norm) / 2.0 * upper + (1.0 - beta_norm) / 2.0 * lower;
        let meta = *request.input.meta();
        let slab = meta.dims[0] * meta.dims[1] * meta.components;

        dispatch_scalar!(meta.scalar, T => {
            let out_min = T::from_f64_clamped(params.float("output_minimum")?).to_f64();
            let out_max = T::from_f64_clamped(params.float("output_maximum")?).to_f64();
            let view = request.input.view::<T>()?;
            let mut out = Vec::with_capacity(view.data.len());
            for (z, chunk) in view.data.chunks(slab).enumerate() {
                request.ctx.checkpoint()?;
                for &v in chunk {
                    let s = 1.0 / (1.0 + (-(v.to_f64() - beta) / alpha).exp());
                    out.push(T::from_f64_clamped(out_min + (out_max - out_min) * s));
                }
                request.ctx.progress((z + 1) as f32 / meta.dims[2] as f32);
            }
            Ok(FilterOutput::new(TypedImage::new(meta, out)?.into_buffer()))
        })
    }
}
