//! Filter manifests: identity, capabilities, and parameter contracts.
//!
//! The manifest is everything a host needs before running a filter:
//! what to call it, where to list it, which capability flags to
//! negotiate, how much working memory to budget, and the full
//! parameter contract with defaults. Manifests serialize to JSON so
//! hosts can build their configuration surface without linking the
//! filter code.

use serde::{Deserialize, Serialize};

use crate::params::ParamSpec;

/// Capability flags consumed during host negotiation.
///
/// These describe what the filter tolerates, not what it prefers; the
/// processing path itself always runs whole-volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    /// The filter may alias input and output buffers in place.
    pub in_place: bool,
    /// The host may stream the volume through in independent pieces.
    pub pieces: bool,
    /// At least one seed marker must be placed before invocation.
    pub requires_seeds: bool,
    /// A second input volume on the same grid is required.
    pub requires_second_input: bool,
    /// Only single-component inputs are accepted.
    pub single_component_only: bool,
}

/// Static description of one filter plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Stable machine name, e.g. "confidence_connected".
    pub name: String,
    /// Menu group the host lists the filter under.
    pub group: String,
    /// One-line description.
    pub summary: String,
    /// Longer text for the host's documentation panel.
    pub description: String,
    /// Negotiation flags.
    pub capabilities: Capabilities,
    /// Baseline estimate of extra working memory per input voxel, in
    /// bytes. Layout-dependent refinements come from the plugin itself.
    pub per_voxel_memory: usize,
    /// Declared parameters in host display order.
    pub params: Vec<ParamSpec>,
}

impl PluginManifest {
    /// Starts a manifest with empty capabilities and no parameters.
    pub fn new(
        name: impl Into<String>,
        group: impl Into<String>,
        summary: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            summary: summary.into(),
            description: description.into(),
            capabilities: Capabilities::default(),
            per_voxel_memory: 0,
            params: Vec::new(),
        }
    }

    /// Sets the capability flags.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Sets the baseline per-voxel working memory estimate.
    pub fn with_per_voxel_memory(mut self, bytes: usize) -> Self {
        self.per_voxel_memory = bytes;
        self
    }

    /// Sets the parameter contract.
    pub fn with_params(mut self, params: Vec<ParamSpec>) -> Self {
        self.params = params;
        self
    }

    /// Looks up a declared parameter by name.
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Serializes the manifest to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses a manifest from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
