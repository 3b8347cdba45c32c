//! The filter plugin contract.
//!
//! A filter is anything that implements [`FilterPlugin`]: it publishes
//! a manifest, declares the output layout it will produce for a given
//! input, and runs against a fully validated [`Request`]. Plugins
//! never touch host buffers directly; they stage their result in an
//! owned [`VolumeBuffer`](crate::volume::VolumeBuffer) and leave the
//! write-back to the invocation seam.

use crate::error::PluginResult;
use crate::manifest::PluginManifest;
use crate::params::ParameterMap;
use crate::progress::ExecContext;
use crate::runner::RunReport;
use crate::scalar::ScalarKind;
use crate::seed::SeedPoint;
use crate::volume::{VolumeBuffer, VolumeMeta, VolumeSource};

/// Storage layout a filter will produce for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputLayout {
    /// Element kind of the output samples.
    pub scalar: ScalarKind,
    /// Components per output voxel.
    pub components: usize,
}

impl OutputLayout {
    /// An explicit layout.
    pub fn new(scalar: ScalarKind, components: usize) -> Self {
        Self { scalar, components }
    }

    /// The same layout as the given input.
    pub fn matching(meta: &VolumeMeta) -> Self {
        Self {
            scalar: meta.scalar,
            components: meta.components,
        }
    }

    /// A single-component unsigned byte mask.
    pub fn mask() -> Self {
        Self {
            scalar: ScalarKind::UInt8,
            components: 1,
        }
    }
}

/// Everything a filter sees for one invocation.
///
/// By the time a request reaches [`FilterPlugin::run`], the invocation
/// seam has already parsed parameters, converted seeds, and verified
/// every capability the manifest declares.
pub struct Request<'a> {
    /// Primary input volume.
    pub input: &'a VolumeSource<'a>,
    /// Second input for dual-input filters; grid and element kind are
    /// already verified against the primary.
    pub second_input: Option<&'a VolumeSource<'a>>,
    /// Parsed parameter values with defaults filled in.
    pub params: &'a ParameterMap,
    /// Converted seed points, all inside the volume extent.
    pub seeds: &'a [SeedPoint],
    /// Progress and cancellation bridge for this invocation.
    pub ctx: &'a ExecContext<'a>,
}

/// What a filter hands back on success.
#[derive(Debug)]
pub struct FilterOutput {
    /// Staged output volume; only the invocation seam copies it into
    /// the host buffer.
    pub volume: VolumeBuffer,
    /// Iteration summary when a convergence-driven runner was used.
    pub run: Option<RunReport>,
    /// Text for the host's results panel.
    pub report_text: Option<String>,
}

impl FilterOutput {
    /// Wraps a staged volume with no extra reporting.
    pub fn new(volume: VolumeBuffer) -> Self {
        Self {
            volume,
            run: None,
            report_text: None,
        }
    }

    /// Attaches the iteration summary.
    pub fn with_run(mut self, run: RunReport) -> Self {
        self.run = Some(run);
        self
    }

    /// Attaches report text.
    pub fn with_report_text(mut self, text: impl Into<String>) -> Self {
        self.report_text = Some(text.into());
        self
    }
}

/// A volume filter exposed through the bridge.
pub trait FilterPlugin {
    /// Static identity, capabilities, and parameter contract.
    fn manifest(&self) -> &PluginManifest;

    /// Layout of the output volume for the given input and parameters.
    ///
    /// The host allocates its output buffer from this before `run` is
    /// called; the staged result must match it exactly.
    fn output_layout(&self, input: &VolumeMeta, params: &ParameterMap) -> OutputLayout;

    /// Refined per-voxel working memory estimate for this invocation.
    ///
    /// Defaults to the manifest baseline; filters whose footprint
    /// depends on the input layout or a parameter override it.
    fn per_voxel_memory(&self, input: &VolumeMeta, params: &ParameterMap) -> usize {
        let _ = (input, params);
        self.manifest().per_voxel_memory
    }

    /// Executes the pipeline and stages the output volume.
    fn run(&self, request: &Request<'_>) -> PluginResult<FilterOutput>;
}
