//! Convergence-driven execution of iterative pipelines.
//!
//! A [`PipelineRunner`] owns a configured pipeline and drives it one
//! iteration at a time until the convergence metric drops to the
//! threshold or the iteration budget runs out. Cancellation is checked
//! before every iteration, progress is reported after every iteration,
//! and any step failure stops the run with a diagnostic. The runner
//! owns the pipeline exclusively while running, so no parameter can
//! change once the first iteration has started.

use serde::{Deserialize, Serialize};

use crate::error::{PluginError, PluginResult};
use crate::progress::ExecContext;

/// One step of an iterative pipeline.
pub trait IterativePipeline {
    /// Advances one iteration and returns the convergence metric
    /// measured after the step (an RMS change, a changed-voxel
    /// fraction, or similar non-negative quantity).
    fn step(&mut self) -> PluginResult<f64>;
}

/// Why a run stopped normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    /// The metric reached the convergence threshold.
    Converged,
    /// The iteration budget ran out first. Not an error: the result is
    /// simply as far as the budget allowed.
    IterationLimitReached,
}

/// Summary of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// How the run stopped.
    pub completion: Completion,
    /// Iterations actually executed.
    pub iterations: u32,
    /// Metric value after the last executed iteration (0 when the
    /// budget was zero).
    pub final_metric: f64,
}

/// Iteration budget and convergence threshold for one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunLimits {
    /// Upper bound on executed iterations.
    pub max_iterations: u32,
    /// The run converges once the metric is `<=` this value.
    pub convergence_threshold: f64,
}

impl RunLimits {
    /// A fixed iteration budget with no early convergence; the run
    /// still converges if the metric reaches exactly zero.
    pub fn iterations(max_iterations: u32) -> Self {
        Self {
            max_iterations,
            convergence_threshold: 0.0,
        }
    }

    /// A budget with an explicit convergence threshold.
    pub fn converging(max_iterations: u32, convergence_threshold: f64) -> Self {
        Self {
            max_iterations,
            convergence_threshold,
        }
    }
}

/// Observable lifecycle of one run.
///
/// `Configured` moves to `Running` when [`PipelineRunner::run`] is
/// entered and from there to exactly one terminal state.
#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    Configured,
    Running,
    Converged,
    IterationLimitReached,
    /// Carries the diagnostic of the failure or cancellation.
    Failed(String),
}

/// Drives an [`IterativePipeline`] against its limits.
pub struct PipelineRunner<P> {
    pipeline: P,
    limits: RunLimits,
    window: (f32, f32),
    state: RunState,
}

impl<P: IterativePipeline> PipelineRunner<P> {
    /// Wraps a configured pipeline. Nothing runs yet.
    pub fn new(pipeline: P, limits: RunLimits) -> Self {
        Self {
            pipeline,
            limits,
            window: (0.0, 1.0),
            state: RunState::Configured,
        }
    }

    /// Maps iteration progress into `[start, end]` instead of
    /// `[0, 1]`, for pipelines that run as one phase of a larger
    /// invocation.
    pub fn with_progress_window(mut self, start: f32, end: f32) -> Self {
        self.window = (start, end);
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Returns the pipeline, e.g. to extract its result buffers after
    /// a successful run.
    pub fn into_pipeline(self) -> P {
        self.pipeline
    }

    /// Runs until convergence, the iteration budget, cancellation, or
    /// a step failure.
    ///
    /// Cancellation is observed before each iteration, so a flag
    /// raised mid-iteration takes effect at the next boundary. A
    /// runner can run once; later calls fail.
    pub fn run(&mut self, ctx: &ExecContext<'_>) -> PluginResult<RunReport> {
        if self.state != RunState::Configured {
            return Err(PluginError::fault("pipeline runner was already run"));
        }
        self.state = RunState::Running;

        let max = self.limits.max_iterations;
        let mut metric = 0.0f64;
        for i in 0..max {
            if let Err(e) = ctx.checkpoint() {
                self.state = RunState::Failed(e.to_string());
                return Err(e);
            }
            metric = match self.pipeline.step() {
                Ok(m) => m,
                Err(e) => {
                    self.state = RunState::Failed(e.to_string());
                    return Err(e);
                }
            };
            let done = i + 1;
            let frac = done as f32 / max as f32;
            ctx.progress(self.window.0 + (self.window.1 - self.window.0) * frac);
            if !metric.is_finite() {
                let e = PluginError::fault(format!(
                    "convergence metric became non-finite at iteration {done}"
                ));
                self.state = RunState::Failed(e.to_string());
                return Err(e);
            }
            if metric <= self.limits.convergence_threshold {
                self.state = RunState::Converged;
                return Ok(RunReport {
                    completion: Completion::Converged,
                    iterations: done,
                    final_metric: metric,
                });
            }
        }

        self.state = RunState::IterationLimitReached;
        Ok(RunReport {
            completion: Completion::IterationLimitReached,
            iterations: max,
            final_metric: metric,
        })
    }
}
