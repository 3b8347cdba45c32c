//! Linear intensity windowing.

use voxbridge_core::dispatch_scalar;
use voxbridge_core::manifest::{Capabilities, PluginManifest};
use voxbridge_core::params::{ParamSpec, ParameterMap};
use voxbridge_core::plugin::{FilterOutput, FilterPlugin, OutputLayout, Request};
use voxbridge_core::rescale::LinearRescale;
use voxbridge_core::scalar::Scalar;
use voxbridge_core::volume::{TypedImage, VolumeMeta};
use voxbridge_core::PluginResult;

/// Maps `[window_minimum, window_maximum]` linearly onto
/// `[output_minimum, output_maximum]`, clamping outside the window.
///
/// Pointwise, so every component of a multi-component volume passes
/// through the same window. Dimensions, spacing, and element kind are
/// unchanged.
pub struct IntensityWindowing {
    manifest: PluginManifest,
}

impl IntensityWindowing {
    pub fn new() -> Self {
        let manifest = PluginManifest::new(
            "intensity_windowing",
            "Intensity Transformation",
            "Intensity windowing transform",
            "Applies a pixel-wise linear transform that maps the window \
             intensity range onto the output range, clamping values that \
             fall outside the window. Dimensions, spacing, and element \
             kind of the volume are unchanged.",
        )
        .with_capabilities(Capabilities {
            pieces: true,
            ..Capabilities::default()
        })
        .with_params(vec![
            ParamSpec::float("window_minimum", 0.0),
            ParamSpec::float("window_maximum", 255.0),
            ParamSpec::float("output_minimum", 0.0),
            ParamSpec::float("output_maximum", 255.0),
        ]);
        Self { manifest }
    }
}

impl Default for IntensityWindowing {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterPlugin for IntensityWindowing {
    fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    fn output_layout(&self, input: &VolumeMeta, _params: &ParameterMap) -> OutputLayout {
        OutputLayout::matching(input)
    }

    fn run(&self, request: &Request<'_>) -> PluginResult<FilterOutput> {
        let params = request.params;
        let rescale = LinearRescale::new(
            (
                params.float("window_minimum")?,
                params.float("window_maximum")?,
            ),
            (
                params.float("output_minimum")?,
                params.float("output_maximum")?,
            ),
        );
        let meta = *request.input.meta();
        let slab = meta.dims[0] * meta.dims[1] * meta.components;

        dispatch_scalar!(meta.scalar, T => {
            let view = request.input.view::<T>()?;
            let mut out = Vec::with_capacity(view.data.len());
            for (z, chunk) in view.data.chunks(slab).enumerate() {
                request.ctx.checkpoint()?;
                for &v in chunk {
                    out.push(T::from_f64_clamped(rescale.apply(v.to_f64())));
                }
                request.ctx.progress((z + 1) as f32 / meta.dims[2] as f32);
            }
            Ok(FilterOutput::new(TypedImage::new(meta, out)?.into_buffer()))
        })
    }
}
