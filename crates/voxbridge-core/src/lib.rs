//! voxbridge Volume Adaptation Core
//!
//! This crate adapts host-owned 3D volumes to image-processing
//! pipelines: the host knows its element type only at runtime, the
//! pipelines want concrete types, and everything in between — buffer
//! views, seeds, parameters, progress, cancellation, and failure — has
//! to cross one well-defined seam.
//!
//! # Overview
//!
//! - **Dispatch**: [`scalar::ScalarKind`] is the closed set of ten
//!   element kinds; [`dispatch_scalar!`] expands a runtime kind into
//!   exactly one monomorphic code path.
//! - **Buffers**: [`volume::VolumeSource`]/[`volume::VolumeSink`] wrap
//!   host allocations with length and alignment checks; typed views
//!   are zero-copy, and pipeline results are staged in owned buffers
//!   until write-back.
//! - **Invocation**: [`invoke::invoke`] validates preconditions,
//!   converts seed markers, contains every pipeline fault including
//!   panics, and writes the host's output buffer only on success.
//!
//! # Example
//!
//! ```
//! use voxbridge_core::scalar::ScalarKind;
//! use voxbridge_core::volume::{VolumeMeta, VolumeSource};
//!
//! // An 8-bit volume owned by the host.
//! let samples: Vec<u8> = (0..8).collect();
//! let meta = VolumeMeta::contiguous([2, 2, 2], ScalarKind::UInt8);
//! let source = VolumeSource::new(meta, &samples).unwrap();
//!
//! // Zero-copy typed view matching the runtime kind.
//! let view = source.view::<u8>().unwrap();
//! assert_eq!(view.value([1, 0, 1]), 5);
//! ```
//!
//! # Modules
//!
//! - [`scalar`]: Element kinds and monomorphic dispatch
//! - [`volume`]: Descriptors, host buffer views, staged buffers
//! - [`params`]: Parameter declarations and host string parsing
//! - [`seed`]: Physical markers mapped onto the voxel grid
//! - [`progress`]: Progress bridging and cooperative cancellation
//! - [`runner`]: Convergence-driven execution of iterative pipelines
//! - [`rescale`]: Linear rescaling and saturating casts
//! - [`composite`]: Dual-component composite assembly
//! - [`manifest`]: Filter identity, capabilities, parameter contracts
//! - [`plugin`]: The filter plugin trait and request types
//! - [`invoke`]: The host-to-filter invocation seam
//! - [`report`]: Execution reports returned to the host
//! - [`error`]: Error types and the invocation status taxonomy

pub mod composite;
pub mod error;
pub mod invoke;
pub mod manifest;
pub mod params;
pub mod plugin;
pub mod progress;
pub mod report;
pub mod rescale;
pub mod runner;
pub mod scalar;
pub mod seed;
pub mod volume;

// Re-export commonly used types at the crate root
pub use composite::interleave_pair;
pub use error::{InvokeStatus, PluginError, PluginResult};
pub use invoke::{invoke, Invocation};
pub use manifest::{Capabilities, PluginManifest};
pub use params::{ParamKind, ParamSpec, ParamValue, ParameterMap};
pub use plugin::{FilterOutput, FilterPlugin, OutputLayout, Request};
pub use progress::{CancelToken, ExecContext, NullProgress, ProgressSink};
pub use report::{ExecutionReport, ReportError};
pub use rescale::{cast_slice_clamped, LinearRescale};
pub use runner::{Completion, IterativePipeline, PipelineRunner, RunLimits, RunReport, RunState};
pub use scalar::{Scalar, ScalarKind};
pub use seed::{convert_markers, seed_to_physical, SeedPoint};
pub use volume::{TypedImage, VolumeBuffer, VolumeMeta, VolumeSink, VolumeSource, VolumeView};
