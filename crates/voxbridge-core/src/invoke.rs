//! The invocation seam between host and filter.
//!
//! [`invoke`] is the one place where host state meets pipeline code.
//! Everything that can be rejected up front is rejected here, before
//! any processing: parameter strings, seed markers, capability
//! requirements, and the output buffer's negotiated layout. Everything
//! that can go wrong during processing, panics included, is caught
//! here and turned into a failed [`ExecutionReport`]. The host's
//! output buffer is written only after the pipeline has fully
//! succeeded, so no failure mode can leave it half-written.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use crate::error::{PluginError, PluginResult};
use crate::params::ParameterMap;
use crate::plugin::{FilterPlugin, Request};
use crate::progress::{CancelToken, ExecContext, NullProgress, ProgressSink};
use crate::report::ExecutionReport;
use crate::seed::convert_markers;
use crate::volume::{VolumeSink, VolumeSource};

static DISCARD: NullProgress = NullProgress;

/// Host-side inputs for one invocation.
pub struct Invocation<'a> {
    /// Primary input volume.
    pub input: VolumeSource<'a>,
    /// Second input for dual-input filters.
    pub second_input: Option<VolumeSource<'a>>,
    /// Raw parameter strings as `(name, value)` pairs.
    pub raw_params: Vec<(String, String)>,
    /// Seed markers in physical coordinates.
    pub markers: Vec<[f32; 3]>,
    /// Cancellation flag shared with the host.
    pub cancel: CancelToken,
    /// Progress receiver; `None` discards updates.
    pub progress: Option<&'a dyn ProgressSink>,
}

impl<'a> Invocation<'a> {
    /// An invocation with no parameters, markers, or observers.
    pub fn new(input: VolumeSource<'a>) -> Self {
        Self {
            input,
            second_input: None,
            raw_params: Vec::new(),
            markers: Vec::new(),
            cancel: CancelToken::new(),
            progress: None,
        }
    }

    /// Adds a second input volume.
    pub fn with_second_input(mut self, second: VolumeSource<'a>) -> Self {
        self.second_input = Some(second);
        self
    }

    /// Adds raw parameter strings.
    pub fn with_raw_params(mut self, raw: Vec<(String, String)>) -> Self {
        self.raw_params = raw;
        self
    }

    /// Adds seed markers in physical coordinates.
    pub fn with_markers(mut self, markers: Vec<[f32; 3]>) -> Self {
        self.markers = markers;
        self
    }

    /// Shares the host's cancellation token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Registers a progress receiver.
    pub fn with_progress(mut self, sink: &'a dyn ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }
}

/// Runs one filter against host buffers.
///
/// Never panics and never returns early: every outcome, success or
/// not, is an [`ExecutionReport`]. The sink keeps its prior contents
/// unless the report says `Success`.
pub fn invoke(
    plugin: &dyn FilterPlugin,
    invocation: &Invocation<'_>,
    sink: &mut VolumeSink<'_>,
) -> ExecutionReport {
    let started = Instant::now();
    let name = plugin.manifest().name.clone();
    let report = match invoke_inner(plugin, invocation, sink) {
        Ok(report) => report,
        Err(err) => ExecutionReport::failure(&name, &err),
    };
    report.with_duration_ms(started.elapsed().as_millis() as u64)
}

fn invoke_inner(
    plugin: &dyn FilterPlugin,
    invocation: &Invocation<'_>,
    sink: &mut VolumeSink<'_>,
) -> PluginResult<ExecutionReport> {
    let manifest = plugin.manifest();
    let caps = manifest.capabilities;
    let input_meta = *invocation.input.meta();

    let params = ParameterMap::from_raw(&manifest.params, &invocation.raw_params)?;

    if caps.single_component_only && input_meta.components != 1 {
        return Err(PluginError::SingleComponentRequired {
            components: input_meta.components,
        });
    }

    let seeds = if caps.requires_seeds {
        if invocation.markers.is_empty() {
            return Err(PluginError::MissingSeeds);
        }
        convert_markers(&input_meta, &invocation.markers)?
    } else {
        Vec::new()
    };

    let second_input = match invocation.second_input.as_ref() {
        Some(second) => {
            if !input_meta.same_grid(second.meta()) {
                return Err(PluginError::GridMismatch);
            }
            if second.meta().scalar != input_meta.scalar {
                return Err(PluginError::ScalarMismatch {
                    actual: second.meta().scalar,
                    requested: input_meta.scalar,
                });
            }
            Some(second)
        }
        None if caps.requires_second_input => return Err(PluginError::MissingSecondInput),
        None => None,
    };

    let layout = plugin.output_layout(&input_meta, &params);
    if !input_meta.same_grid(sink.meta()) {
        return Err(PluginError::GridMismatch);
    }
    if sink.meta().scalar != layout.scalar || sink.meta().components != layout.components {
        return Err(PluginError::OutputLayoutMismatch {
            expected_scalar: layout.scalar,
            expected_components: layout.components,
            found_scalar: sink.meta().scalar,
            found_components: sink.meta().components,
        });
    }

    let progress: &dyn ProgressSink = invocation.progress.unwrap_or(&DISCARD);
    let ctx = ExecContext::new(progress, invocation.cancel.clone());
    ctx.checkpoint()?;
    ctx.progress(0.0);

    let request = Request {
        input: &invocation.input,
        second_input,
        params: &params,
        seeds: &seeds,
        ctx: &ctx,
    };

    // All staged state is discarded on unwind; host buffers stay
    // read-only until write_back.
    let output = match catch_unwind(AssertUnwindSafe(|| plugin.run(&request))) {
        Ok(result) => result?,
        Err(payload) => return Err(PluginError::fault(panic_message(payload))),
    };

    sink.write_back(&output.volume)?;
    ctx.progress(1.0);

    let mut report = ExecutionReport::success(&manifest.name, *output.volume.meta());
    if let Some(run) = output.run {
        report = report.with_run(run);
    }
    if let Some(text) = output.report_text {
        report = report.with_report_text(text);
    }
    Ok(report)
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("pipeline panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("pipeline panicked: {s}")
    } else {
        "pipeline panicked".to_string()
    }
}
