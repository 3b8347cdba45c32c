//! Progress reporting and cooperative cancellation.
//!
//! Hosts observe a running pipeline through two narrow channels: a
//! [`ProgressSink`] that receives completed-fraction updates, and a
//! [`CancelToken`] they may raise from any thread. The bridge
//! guarantees the fractions a sink sees are clamped to `[0, 1]` and
//! never decrease within one invocation, whatever the pipeline
//! underneath reports.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{PluginError, PluginResult};

/// Receiver for progress updates during one invocation.
pub trait ProgressSink {
    /// Called with the completed fraction in `[0, 1]`.
    fn update(&self, fraction: f32);
}

/// A sink that discards every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn update(&self, _fraction: f32) {}
}

/// Shared cancellation flag the host may raise at any time.
///
/// Clones share one flag. Cancellation is cooperative: pipelines poll
/// it at safe boundaries and unwind cleanly, so there is no way to
/// interrupt mid-sweep.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates an unraised token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag. Irrevocable for the current invocation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// True once [`CancelToken::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Execution-side bridge carried through one invocation.
///
/// Wraps the host's sink with the monotonicity guarantee and exposes
/// the cancellation flag as a checkpoint call.
pub struct ExecContext<'a> {
    sink: &'a dyn ProgressSink,
    cancel: CancelToken,
    last: Cell<f32>,
}

impl<'a> ExecContext<'a> {
    /// Bridges a host sink and cancellation token.
    pub fn new(sink: &'a dyn ProgressSink, cancel: CancelToken) -> Self {
        Self {
            sink,
            cancel,
            last: Cell::new(-1.0),
        }
    }

    /// Forwards a progress fraction to the host.
    ///
    /// The value is clamped to `[0, 1]`; updates that do not advance
    /// past the last forwarded value are dropped, as are non-finite
    /// ones.
    pub fn progress(&self, fraction: f32) {
        if !fraction.is_finite() {
            return;
        }
        let f = fraction.clamp(0.0, 1.0);
        if f > self.last.get() {
            self.last.set(f);
            self.sink.update(f);
        }
    }

    /// Fails with [`PluginError::Cancelled`] once the host has raised
    /// the flag. Pipelines call this at every safe boundary.
    pub fn checkpoint(&self) -> PluginResult<()> {
        if self.cancel.is_cancelled() {
            Err(PluginError::Cancelled)
        } else {
            Ok(())
        }
    }
}
