//! Name-keyed store for the filter plugins a host exposes.

use std::collections::HashMap;

use voxbridge_core::manifest::PluginManifest;
use voxbridge_core::plugin::FilterPlugin;
use voxbridge_core::{PluginError, PluginResult};

use crate::antialias::Antialias;
use crate::diffusion::GradientAnisotropicDiffusion;
use crate::geodesic::{GeodesicActiveContour, GeodesicActiveContourModule};
use crate::gradient::GradientMagnitude;
use crate::region_grow::ConfidenceConnected;
use crate::sigmoid::Sigmoid;
use crate::windowing::IntensityWindowing;

/// Registry of filter plugins, looked up by manifest name.
///
/// Hosts typically build one once at startup with [`FilterRegistry::builtin`],
/// read the manifests to populate their menus, and resolve a plugin by
/// name when the user applies a filter.
#[derive(Default)]
pub struct FilterRegistry {
    plugins: HashMap<String, Box<dyn FilterPlugin>>,
    /// Registration order, so menus list filters deterministically.
    order: Vec<String>,
}

impl FilterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in filter.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        let plugins: Vec<Box<dyn FilterPlugin>> = vec![
            Box::new(GradientAnisotropicDiffusion::new()),
            Box::new(GradientMagnitude::new()),
            Box::new(IntensityWindowing::new()),
            Box::new(Sigmoid::new()),
            Box::new(Antialias::new()),
            Box::new(ConfidenceConnected::new()),
            Box::new(GeodesicActiveContour::new()),
            Box::new(GeodesicActiveContourModule::new()),
        ];
        for plugin in plugins {
            registry
                .register(plugin)
                .expect("built-in filter names are distinct");
        }
        registry
    }

    /// Registers a plugin under its manifest name.
    ///
    /// Rejects a second plugin with a name that is already taken, so a
    /// menu entry always resolves to one filter.
    pub fn register(&mut self, plugin: Box<dyn FilterPlugin>) -> PluginResult<()> {
        let name = plugin.manifest().name.clone();
        if self.plugins.contains_key(&name) {
            return Err(PluginError::descriptor(format!(
                "filter '{name}' is already registered"
            )));
        }
        self.order.push(name.clone());
        self.plugins.insert(name, plugin);
        Ok(())
    }

    /// Looks up a plugin by manifest name.
    pub fn get(&self, name: &str) -> Option<&dyn FilterPlugin> {
        self.plugins.get(name).map(|p| p.as_ref())
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    /// Manifests in registration order.
    pub fn manifests(&self) -> Vec<&PluginManifest> {
        self.order
            .iter()
            .filter_map(|name| self.plugins.get(name))
            .map(|p| p.manifest())
            .collect()
    }

    /// Number of registered plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns true if no plugins are registered.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
