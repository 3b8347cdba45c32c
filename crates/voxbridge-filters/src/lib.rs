//! Built-in volume filters for voxbridge.
//!
//! # Overview
//!
//! Eight filters cover a volume host's processing menu:
//!
//! - Noise Suppression: [`GradientAnisotropicDiffusion`]
//! - Utility: [`GradientMagnitude`]
//! - Intensity Transformation: [`IntensityWindowing`], [`Sigmoid`]
//! - Surface Generation: [`Antialias`]
//! - Segmentation - Region Growing: [`ConfidenceConnected`]
//! - Segmentation - Level Sets: [`GeodesicActiveContour`],
//!   [`GeodesicActiveContourModule`]
//!
//! Each filter implements [`voxbridge_core::FilterPlugin`] and is
//! usually reached through the [`FilterRegistry`] rather than
//! constructed directly:
//!
//! ```
//! use voxbridge_filters::FilterRegistry;
//!
//! let registry = FilterRegistry::builtin();
//! let plugin = registry.get("gradient_magnitude").unwrap();
//! assert_eq!(plugin.manifest().group, "Utility");
//! ```

mod grid;
mod level_set;

pub mod antialias;
pub mod diffusion;
pub mod geodesic;
pub mod gradient;
pub mod region_grow;
pub mod registry;
pub mod sigmoid;
pub mod windowing;

pub use antialias::Antialias;
pub use diffusion::GradientAnisotropicDiffusion;
pub use geodesic::{GeodesicActiveContour, GeodesicActiveContourModule};
pub use gradient::GradientMagnitude;
pub use region_grow::ConfidenceConnected;
pub use registry::FilterRegistry;
pub use sigmoid::Sigmoid;
pub use windowing::IntensityWindowing;
