//! Manifests and registry lookups, the way a host menu consumes them.
//!
//! At startup a host reads every manifest once to build its filter
//! menu, then resolves plugins by name per invocation. Manifests must
//! serialize losslessly and declare the capabilities and parameters
//! the seam later enforces.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p voxbridge-tests --test manifest_registry
//! ```

use pretty_assertions::assert_eq;
use serde::Deserialize;

use voxbridge_core::{
    invoke, InvokeStatus, Invocation, ParamValue, ParameterMap, PluginManifest, ScalarKind,
    VolumeMeta, VolumeSink, VolumeSource,
};
use voxbridge_filters::FilterRegistry;
use voxbridge_tests::raw_params;

/// The slice of a manifest a menu actually renders.
#[derive(Debug, Deserialize, PartialEq)]
struct MenuEntry {
    name: String,
    group: String,
    summary: String,
}

#[test]
fn test_builtin_menu_covers_every_processing_group() {
    let registry = FilterRegistry::builtin();
    assert_eq!(registry.len(), 8);

    let json = serde_json::to_string(&registry.manifests()).unwrap();
    let menu: Vec<MenuEntry> = serde_json::from_str(&json).unwrap();

    let entry = |name: &str| menu.iter().find(|e| e.name == name).unwrap();
    assert_eq!(entry("gradient_anisotropic_diffusion").group, "Noise Suppression");
    assert_eq!(entry("gradient_magnitude").group, "Utility");
    assert_eq!(entry("intensity_windowing").group, "Intensity Transformation");
    assert_eq!(entry("sigmoid").group, "Intensity Transformation");
    assert_eq!(entry("antialias").group, "Surface Generation");
    assert_eq!(entry("confidence_connected").group, "Segmentation - Region Growing");
    assert_eq!(entry("geodesic_active_contour").group, "Segmentation - Level Sets");
    assert_eq!(
        entry("geodesic_active_contour_module").group,
        "Segmentation - Level Sets"
    );
}

#[test]
fn test_capability_flags_match_each_filter_contract() {
    let registry = FilterRegistry::builtin();
    let caps = |name: &str| registry.get(name).unwrap().manifest().capabilities;

    assert!(caps("confidence_connected").requires_seeds);
    assert!(caps("confidence_connected").single_component_only);
    assert!(caps("geodesic_active_contour").requires_second_input);
    assert!(caps("geodesic_active_contour_module").requires_seeds);
    assert!(caps("antialias").single_component_only);
    assert!(!caps("gradient_magnitude").requires_seeds);
    assert!(caps("intensity_windowing").pieces);
    assert!(caps("sigmoid").pieces);
    assert!(!caps("gradient_anisotropic_diffusion").pieces);
}

#[test]
fn test_per_voxel_memory_estimates() {
    let registry = FilterRegistry::builtin();
    let memory = |name: &str| registry.get(name).unwrap().manifest().per_voxel_memory;

    assert_eq!(memory("intensity_windowing"), 0);
    assert_eq!(memory("sigmoid"), 0);
    assert_eq!(memory("gradient_magnitude"), 0);
    assert_eq!(memory("gradient_anisotropic_diffusion"), 8);
    assert_eq!(memory("antialias"), 8);
    assert_eq!(memory("confidence_connected"), 1);
    assert_eq!(memory("geodesic_active_contour"), 16);
    assert_eq!(memory("geodesic_active_contour_module"), 16);
}

#[test]
fn test_declared_defaults_survive_the_parameter_map() {
    let registry = FilterRegistry::builtin();
    let diffusion = registry.get("gradient_anisotropic_diffusion").unwrap();
    let params = ParameterMap::from_defaults(&diffusion.manifest().params);
    assert_eq!(params.int("iterations").unwrap(), 5);
    assert_eq!(params.float("time_step").unwrap(), 0.05);
    assert_eq!(params.float("conductance").unwrap(), 3.0);

    let sigmoid = registry.get("sigmoid").unwrap();
    let params = ParameterMap::from_defaults(&sigmoid.manifest().params);
    assert_eq!(params.float("alpha").unwrap(), 5.0);
    assert_eq!(params.float("beta").unwrap(), 0.0);

    let module = registry.get("geodesic_active_contour_module").unwrap();
    let params = ParameterMap::from_defaults(&module.manifest().params);
    assert_eq!(params.float("distance_from_seeds").unwrap(), 5.0);
    assert_eq!(params.float("lowest_border_value").unwrap(), 6.0);
    assert_eq!(params.int("iterations").unwrap(), 100);
}

#[test]
fn test_manifest_json_round_trip_is_lossless() {
    let registry = FilterRegistry::builtin();
    for manifest in registry.manifests() {
        let json = serde_json::to_string(manifest).unwrap();
        let back: PluginManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(&back, manifest);
    }
}

#[test]
fn test_every_declared_default_matches_its_kind() {
    let registry = FilterRegistry::builtin();
    for manifest in registry.manifests() {
        let params = ParameterMap::from_defaults(&manifest.params);
        for spec in &manifest.params {
            let value = params.get(&spec.name).unwrap();
            let matches = matches!(
                (spec.default, value),
                (ParamValue::Int(_), ParamValue::Int(_))
                    | (ParamValue::Float(_), ParamValue::Float(_))
                    | (ParamValue::Bool(_), ParamValue::Bool(_))
            );
            assert!(matches, "{}::{}", manifest.name, spec.name);
        }
    }
}

#[test]
fn test_unknown_parameter_fails_the_invocation() {
    let registry = FilterRegistry::builtin();
    let plugin = registry.get("intensity_windowing").unwrap();

    let meta = VolumeMeta::contiguous([2, 2, 2], ScalarKind::UInt8);
    let bytes = vec![0u8; 8];
    let source = VolumeSource::new(meta, &bytes).unwrap();
    let invocation =
        Invocation::new(source).with_raw_params(raw_params(&[("window_center", "50")]));
    let mut out = vec![0u8; 8];
    let mut sink = VolumeSink::new(meta, &mut out).unwrap();

    let report = invoke(plugin, &invocation, &mut sink);
    assert_eq!(report.status, InvokeStatus::Precondition);
    assert_eq!(report.error.unwrap().code, "VB_007");
}
