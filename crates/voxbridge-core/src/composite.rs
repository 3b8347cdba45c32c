//! Dual-component composite assembly.
//!
//! Segmentation filters can hand back both the original intensities
//! and the derived mask in one volume: component 0 carries the input
//! value, component 1 the derived value cast into the input's element
//! kind. Hosts overlay the two without re-reading the input volume.

use crate::error::{PluginError, PluginResult};
use crate::scalar::Scalar;
use crate::volume::{TypedImage, VolumeView};

/// Interleaves a single-component original with a derived companion
/// image into one two-component volume of the original's kind.
///
/// `derived` must hold one value per voxel; each is cast into `T` with
/// saturation. Component order is `[original, derived]` per voxel.
pub fn interleave_pair<T: Scalar, D: Scalar>(
    original: VolumeView<'_, T>,
    derived: &[D],
) -> PluginResult<TypedImage<T>> {
    if original.meta.components != 1 {
        return Err(PluginError::fault(format!(
            "composite source must be single-component, has {}",
            original.meta.components
        )));
    }
    if derived.len() != original.data.len() {
        return Err(PluginError::fault(format!(
            "composite companion holds {} values for {} voxels",
            derived.len(),
            original.data.len()
        )));
    }
    let mut data = Vec::with_capacity(original.data.len() * 2);
    for (&a, &b) in original.data.iter().zip(derived) {
        data.push(a);
        data.push(T::from_f64_clamped(b.to_f64()));
    }
    TypedImage::new(original.meta.with_layout(T::KIND, 2), data)
}
