//! Shared voxel-grid numerics for the built-in filters.
//!
//! Filters that bridge through working precision operate on
//! per-component `f32` planes in x-fastest order. The helpers here
//! split and merge those planes, walk 6-connected face neighborhoods,
//! and evaluate spacing-aware derivatives with one-sided differences
//! at the volume faces.

use voxbridge_core::scalar::Scalar;
use voxbridge_core::volume::VolumeView;

/// Linear offset of a voxel in an x-fastest single-component plane.
#[inline]
pub(crate) fn offset(dims: [usize; 3], p: [usize; 3]) -> usize {
    (p[2] * dims[1] + p[1]) * dims[0] + p[0]
}

/// The point with one coordinate replaced.
#[inline]
pub(crate) fn shifted(p: [usize; 3], axis: usize, value: usize) -> [usize; 3] {
    let mut q = p;
    q[axis] = value;
    q
}

/// Splits an interleaved view into one `f32` plane per component.
pub(crate) fn split_components<T: Scalar>(view: &VolumeView<'_, T>) -> Vec<Vec<f32>> {
    let components = view.meta.components;
    let voxels = view.meta.voxel_count();
    let mut planes: Vec<Vec<f32>> = (0..components)
        .map(|_| Vec::with_capacity(voxels))
        .collect();
    for (i, &v) in view.data.iter().enumerate() {
        planes[i % components].push(v.to_f32());
    }
    planes
}

/// Interleaves component planes back into one sample vector, casting
/// each value into `T` with saturation.
pub(crate) fn merge_components<T: Scalar>(planes: &[Vec<f32>]) -> Vec<T> {
    let voxels = planes.first().map_or(0, Vec::len);
    let mut out = Vec::with_capacity(voxels * planes.len());
    for i in 0..voxels {
        for plane in planes {
            out.push(T::from_f32_clamped(plane[i]));
        }
    }
    out
}

/// Visits the in-bounds face neighbors of `p` (up to six).
pub(crate) fn visit_face_neighbors(
    dims: [usize; 3],
    p: [usize; 3],
    mut visit: impl FnMut([usize; 3]),
) {
    for axis in 0..3 {
        if p[axis] > 0 {
            visit(shifted(p, axis, p[axis] - 1));
        }
        if p[axis] + 1 < dims[axis] {
            visit(shifted(p, axis, p[axis] + 1));
        }
    }
}

/// First derivative along one axis in physical units.
///
/// Central differences inside the volume, one-sided on the faces, zero
/// along a flat axis.
pub(crate) fn axis_derivative(
    f: &[f32],
    dims: [usize; 3],
    spacing: [f32; 3],
    p: [usize; 3],
    axis: usize,
) -> f32 {
    let n = dims[axis];
    if n < 2 {
        return 0.0;
    }
    let i = p[axis];
    let (fwd, bwd, span) = if i == 0 {
        (1, 0, 1.0)
    } else if i + 1 == n {
        (i, i - 1, 1.0)
    } else {
        (i + 1, i - 1, 2.0)
    };
    let a = f[offset(dims, shifted(p, axis, fwd))];
    let b = f[offset(dims, shifted(p, axis, bwd))];
    (a - b) / (span * spacing[axis])
}

/// Gradient magnitude of a single-component plane, spacing-aware.
pub(crate) fn gradient_magnitude_plane(
    f: &[f32],
    dims: [usize; 3],
    spacing: [f32; 3],
) -> Vec<f32> {
    let mut out = vec![0.0f32; f.len()];
    for z in 0..dims[2] {
        for y in 0..dims[1] {
            for x in 0..dims[0] {
                let p = [x, y, z];
                let mut sum = 0.0f32;
                for axis in 0..3 {
                    let g = axis_derivative(f, dims, spacing, p, axis);
                    sum += g * g;
                }
                out[offset(dims, p)] = sum.sqrt();
            }
        }
    }
    out
}

/// Normalized discrete Gaussian kernel with radius `ceil(3 sigma)`.
pub(crate) fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    if sigma <= 0.0 {
        return vec![1.0];
    }
    let radius = (3.0 * sigma).ceil() as isize;
    let mut kernel = Vec::with_capacity((2 * radius + 1) as usize);
    for o in -radius..=radius {
        let x = o as f32 / sigma;
        kernel.push((-0.5 * x * x).exp());
    }
    let sum: f32 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

/// Separable Gaussian smoothing in place.
///
/// `sigma` is in physical units and is divided by the per-axis spacing
/// before building each 1D kernel. Volume faces reflect.
pub(crate) fn gaussian_smooth(
    f: &mut Vec<f32>,
    dims: [usize; 3],
    spacing: [f32; 3],
    sigma: f32,
) {
    for axis in 0..3 {
        if sigma <= 0.0 || dims[axis] < 2 {
            continue;
        }
        let kernel = gaussian_kernel(sigma / spacing[axis]);
        if kernel.len() > 1 {
            convolve_axis(f, dims, axis, &kernel);
        }
    }
}

fn convolve_axis(f: &mut Vec<f32>, dims: [usize; 3], axis: usize, kernel: &[f32]) {
    let radius = (kernel.len() / 2) as isize;
    let n = dims[axis] as isize;
    let mut out = vec![0.0f32; f.len()];
    for z in 0..dims[2] {
        for y in 0..dims[1] {
            for x in 0..dims[0] {
                let p = [x, y, z];
                let mut acc = 0.0f32;
                for (k, &w) in kernel.iter().enumerate() {
                    let mut i = p[axis] as isize + k as isize - radius;
                    if i < 0 {
                        i = -i;
                    }
                    if i >= n {
                        i = 2 * n - 2 - i;
                    }
                    let i = i.clamp(0, n - 1) as usize;
                    acc += w * f[offset(dims, shifted(p, axis, i))];
                }
                out[offset(dims, p)] = acc;
            }
        }
    }
    *f = out;
}
