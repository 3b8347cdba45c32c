//! Execution reports returned to the host.
//!
//! Every invocation, successful or not, produces one
//! [`ExecutionReport`]: the terminal status, error details when the
//! run did not succeed, the iteration summary for convergence-driven
//! pipelines, and the filter's report text for the host's results
//! panel. Reports serialize to JSON so hosts can log or display them
//! without knowing any filter internals.

use serde::{Deserialize, Serialize};

use crate::error::{InvokeStatus, PluginError};
use crate::runner::RunReport;
use crate::volume::VolumeMeta;

/// Error entry in an execution report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportError {
    /// Stable error code (e.g., "VB_005").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ReportError {
    /// Creates a new report error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Captures a plugin error's code and message.
    pub fn from_plugin_error(err: &PluginError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// The complete outcome of one filter invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Name of the filter that ran.
    pub filter: String,
    /// How the invocation ended.
    pub status: InvokeStatus,
    /// Error details for any non-success status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ReportError>,
    /// Descriptor of the volume written on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<VolumeMeta>,
    /// Iteration summary for convergence-driven pipelines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<RunReport>,
    /// Filter-specific text for the host's results panel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_text: Option<String>,
    /// Wall-clock execution time in milliseconds.
    pub duration_ms: u64,
}

impl ExecutionReport {
    /// Report for a successful run that wrote `output`.
    pub fn success(filter: impl Into<String>, output: VolumeMeta) -> Self {
        Self {
            filter: filter.into(),
            status: InvokeStatus::Success,
            error: None,
            output: Some(output),
            run: None,
            report_text: None,
            duration_ms: 0,
        }
    }

    /// Report for a failed run; the status comes from the error.
    pub fn failure(filter: impl Into<String>, err: &PluginError) -> Self {
        Self {
            filter: filter.into(),
            status: err.status(),
            error: Some(ReportError::from_plugin_error(err)),
            output: None,
            run: None,
            report_text: None,
            duration_ms: 0,
        }
    }

    /// Attaches the iteration summary.
    pub fn with_run(mut self, run: RunReport) -> Self {
        self.run = Some(run);
        self
    }

    /// Attaches filter-specific report text.
    pub fn with_report_text(mut self, text: impl Into<String>) -> Self {
        self.report_text = Some(text.into());
        self
    }

    /// Sets the measured duration.
    pub fn with_duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = ms;
        self
    }

    /// True when the host output buffer was written.
    pub fn is_success(&self) -> bool {
        self.status == InvokeStatus::Success
    }

    /// Serializes the report to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses a report from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::Completion;
    use crate::scalar::ScalarKind;

    #[test]
    fn test_success_report_serialization() {
        let meta = VolumeMeta::contiguous([4, 4, 4], ScalarKind::UInt8);
        let report = ExecutionReport::success("gradient_magnitude", meta)
            .with_duration_ms(12)
            .with_run(RunReport {
                completion: Completion::Converged,
                iterations: 7,
                final_metric: 0.05,
            });

        assert!(report.is_success());
        let json = report.to_json().unwrap();
        assert!(json.contains("\"status\":\"success\""));
        assert!(json.contains("\"iterations\":7"));
        assert!(!json.contains("\"error\""));

        let parsed = ExecutionReport::from_json(&json).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn test_failure_report_carries_code_and_message() {
        let report = ExecutionReport::failure("confidence_connected", &PluginError::MissingSeeds);
        assert_eq!(report.status, InvokeStatus::Precondition);
        let err = report.error.as_ref().unwrap();
        assert_eq!(err.code, "VB_005");
        assert!(err.message.contains("seed point"));
        assert!(report.output.is_none());
    }

    #[test]
    fn test_cancelled_report_status() {
        let report = ExecutionReport::failure("antialias", &PluginError::Cancelled);
        assert_eq!(report.status, InvokeStatus::Cancelled);
        let json = report.to_json().unwrap();
        assert!(json.contains("\"status\":\"cancelled\""));
    }
}
