//! Seed markers: physical positions mapped onto the voxel grid.
//!
//! Hosts place markers in physical (world) coordinates. Seeded filters
//! need voxel indices, so the bridge converts each marker through the
//! volume's origin and spacing before the pipeline sees it. Markers
//! that land outside the extent are rejected, never clamped.

use serde::{Deserialize, Serialize};

use crate::error::{PluginError, PluginResult};
use crate::volume::VolumeMeta;

/// A seed location in voxel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeedPoint {
    /// Grid position along x, y, z.
    pub index: [usize; 3],
}

impl SeedPoint {
    /// Wraps a grid position.
    pub fn new(index: [usize; 3]) -> Self {
        Self { index }
    }
}

/// Converts every physical marker to a voxel seed.
///
/// Per axis the continuous index is `(marker - origin) / spacing`,
/// rounded to the nearest voxel with ties away from zero. A marker
/// whose rounded index falls outside `0..dims` fails with the marker's
/// position in the list, and no partial seed list is returned.
pub fn convert_markers(meta: &VolumeMeta, markers: &[[f32; 3]]) -> PluginResult<Vec<SeedPoint>> {
    markers
        .iter()
        .enumerate()
        .map(|(i, &m)| convert_marker(meta, m, i))
        .collect()
}

fn convert_marker(meta: &VolumeMeta, marker: [f32; 3], list_index: usize) -> PluginResult<SeedPoint> {
    let outside = || PluginError::SeedOutsideVolume {
        index: list_index,
        x: marker[0],
        y: marker[1],
        z: marker[2],
    };
    let mut index = [0usize; 3];
    for d in 0..3 {
        let continuous = (marker[d] as f64 - meta.origin[d] as f64) / meta.spacing[d] as f64;
        let rounded = continuous.round();
        if !rounded.is_finite() || rounded < 0.0 || rounded >= meta.dims[d] as f64 {
            return Err(outside());
        }
        index[d] = rounded as usize;
    }
    Ok(SeedPoint { index })
}

/// Physical position of a seed's voxel center.
pub fn seed_to_physical(meta: &VolumeMeta, seed: SeedPoint) -> [f32; 3] {
    let mut p = [0.0f32; 3];
    for d in 0..3 {
        p[d] = meta.origin[d] + seed.index[d] as f32 * meta.spacing[d];
    }
    p
}
