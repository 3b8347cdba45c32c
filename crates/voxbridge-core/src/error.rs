//! Error types for volume adaptation and pipeline invocation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scalar::ScalarKind;

/// Result alias used across the core and filter crates.
pub type PluginResult<T> = Result<T, PluginError>;

/// Outcome classification reported back to the host after an invocation.
///
/// Every invocation ends in exactly one of these states. Anything other
/// than `Success` leaves the host's output buffer untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvokeStatus {
    /// The pipeline ran to completion and the output buffer was filled.
    Success,
    /// A precondition on inputs, parameters, or buffers was violated
    /// before any processing started.
    Precondition,
    /// The pipeline started but failed while running.
    PipelineFault,
    /// The host requested cancellation and the pipeline stopped at a
    /// safe boundary.
    Cancelled,
}

/// Unified error type for plugin invocation.
///
/// Each variant carries a stable `VB_xxx` code for programmatic handling;
/// the `Display` text is the human-readable message surfaced to the host.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PluginError {
    // Precondition errors (VB_001-VB_012)
    /// VB_001: Buffer byte length disagrees with the descriptor.
    #[error("buffer length mismatch: descriptor implies {expected} bytes, buffer holds {found}")]
    BufferLength {
        /// Byte length implied by the volume descriptor.
        expected: usize,
        /// Actual byte length of the supplied buffer.
        found: usize,
    },

    /// VB_002: Buffer start is not aligned for the declared scalar kind.
    #[error("buffer is not aligned for {kind} elements")]
    BufferAlignment {
        /// Scalar kind the buffer was declared with.
        kind: ScalarKind,
    },

    /// VB_003: A typed view was requested with the wrong element kind.
    #[error("scalar kind mismatch: volume holds {actual}, view requested {requested}")]
    ScalarMismatch {
        /// Kind recorded in the volume descriptor.
        actual: ScalarKind,
        /// Kind the caller asked to view the buffer as.
        requested: ScalarKind,
    },

    /// VB_004: The filter only accepts single-component volumes.
    #[error("this filter requires a single-component data set, input has {components} components")]
    SingleComponentRequired {
        /// Component count of the rejected input.
        components: usize,
    },

    /// VB_005: A seeded filter was invoked without any seed points.
    #[error("at least one seed point is required; place 3D markers before running")]
    MissingSeeds,

    /// VB_006: A seed marker maps outside the volume extent.
    #[error("seed {index} at physical position ({x}, {y}, {z}) falls outside the volume")]
    SeedOutsideVolume {
        /// Zero-based position of the marker in the seed list.
        index: usize,
        x: f32,
        y: f32,
        z: f32,
    },

    /// VB_007: The host supplied a parameter the filter does not declare.
    #[error("unknown parameter '{name}'")]
    UnknownParameter {
        /// Name received from the host.
        name: String,
    },

    /// VB_008: A raw parameter string could not be parsed as its
    /// declared kind.
    #[error("parameter '{name}' expects {expected}, got '{value}'")]
    ParameterParse {
        /// Declared parameter name.
        name: String,
        /// Raw string received from the host.
        value: String,
        /// Declared kind, as a lowercase word.
        expected: &'static str,
    },

    /// VB_009: The filter needs a second input volume and none was given.
    #[error("this filter requires a second input volume")]
    MissingSecondInput,

    /// VB_010: Primary and secondary inputs lie on different grids.
    #[error("input volumes do not share dimensions, spacing, and origin")]
    GridMismatch,

    /// VB_011: The host's output buffer does not match the layout the
    /// filter declared for this invocation.
    #[error(
        "output buffer holds {found_scalar} x{found_components}, \
         pipeline produces {expected_scalar} x{expected_components}"
    )]
    OutputLayoutMismatch {
        expected_scalar: ScalarKind,
        expected_components: usize,
        found_scalar: ScalarKind,
        found_components: usize,
    },

    /// VB_012: The volume descriptor itself is unusable.
    #[error("invalid volume descriptor: {reason}")]
    InvalidDescriptor {
        /// What made the descriptor unusable.
        reason: String,
    },

    // Runtime errors (VB_101-VB_102)
    /// VB_101: The host's cancellation flag was observed.
    #[error("processing cancelled by the host")]
    Cancelled,

    /// VB_102: The pipeline failed while running.
    #[error("pipeline fault: {message}")]
    PipelineFault {
        /// Diagnostic captured at the failure site.
        message: String,
    },
}

impl PluginError {
    /// Returns the stable error code string (e.g., "VB_001").
    pub fn code(&self) -> &'static str {
        match self {
            PluginError::BufferLength { .. } => "VB_001",
            PluginError::BufferAlignment { .. } => "VB_002",
            PluginError::ScalarMismatch { .. } => "VB_003",
            PluginError::SingleComponentRequired { .. } => "VB_004",
            PluginError::MissingSeeds => "VB_005",
            PluginError::SeedOutsideVolume { .. } => "VB_006",
            PluginError::UnknownParameter { .. } => "VB_007",
            PluginError::ParameterParse { .. } => "VB_008",
            PluginError::MissingSecondInput => "VB_009",
            PluginError::GridMismatch => "VB_010",
            PluginError::OutputLayoutMismatch { .. } => "VB_011",
            PluginError::InvalidDescriptor { .. } => "VB_012",
            PluginError::Cancelled => "VB_101",
            PluginError::PipelineFault { .. } => "VB_102",
        }
    }

    /// Maps the error onto the host-facing invocation status.
    pub fn status(&self) -> InvokeStatus {
        match self {
            PluginError::Cancelled => InvokeStatus::Cancelled,
            PluginError::PipelineFault { .. } => InvokeStatus::PipelineFault,
            _ => InvokeStatus::Precondition,
        }
    }

    /// Builds a pipeline fault from any diagnostic message.
    pub fn fault(message: impl Into<String>) -> Self {
        PluginError::PipelineFault {
            message: message.into(),
        }
    }

    /// Builds a descriptor error from any diagnostic message.
    pub fn descriptor(reason: impl Into<String>) -> Self {
        PluginError::InvalidDescriptor {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = PluginError::BufferLength {
            expected: 64,
            found: 32,
        };
        assert_eq!(err.code(), "VB_001");
        assert_eq!(PluginError::MissingSeeds.code(), "VB_005");
        assert_eq!(PluginError::Cancelled.code(), "VB_101");
        assert_eq!(PluginError::fault("boom").code(), "VB_102");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            PluginError::MissingSecondInput.status(),
            InvokeStatus::Precondition
        );
        assert_eq!(PluginError::Cancelled.status(), InvokeStatus::Cancelled);
        assert_eq!(
            PluginError::fault("divergence").status(),
            InvokeStatus::PipelineFault
        );
    }

    #[test]
    fn test_display_messages() {
        let err = PluginError::ParameterParse {
            name: "iterations".into(),
            value: "abc".into(),
            expected: "int",
        };
        assert_eq!(
            err.to_string(),
            "parameter 'iterations' expects int, got 'abc'"
        );

        let err = PluginError::SeedOutsideVolume {
            index: 2,
            x: -4.0,
            y: 0.5,
            z: 9.0,
        };
        assert_eq!(
            err.to_string(),
            "seed 2 at physical position (-4, 0.5, 9) falls outside the volume"
        );
    }
}
