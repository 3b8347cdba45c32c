//! Volume descriptors and buffer views.
//!
//! The host owns every input and output allocation. This module wraps
//! those raw byte buffers in checked views: [`VolumeSource`] for
//! read-only inputs, [`VolumeSink`] for the output, and the typed
//! [`VolumeView`] obtained from a source without copying. Pipelines
//! stage their results in owned [`TypedImage`]/[`VolumeBuffer`] values;
//! the host buffer is only written after a pipeline has fully
//! succeeded.

use serde::{Deserialize, Serialize};

use crate::dispatch_scalar;
use crate::error::{PluginError, PluginResult};
use crate::scalar::{Scalar, ScalarKind};

/// Shape, geometry, and storage layout of one volume.
///
/// Samples are interleaved x-fastest: the sample for component `c` of
/// voxel `(x, y, z)` lives at `((z * dims[1] + y) * dims[0] + x) *
/// components + c`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeMeta {
    /// Extent in voxels along x, y, z.
    pub dims: [usize; 3],
    /// Physical size of one voxel along each axis.
    pub spacing: [f32; 3],
    /// Physical position of the center of voxel (0, 0, 0).
    pub origin: [f32; 3],
    /// Element kind of the stored samples.
    pub scalar: ScalarKind,
    /// Interleaved components per voxel (1 for plain scalar volumes).
    pub components: usize,
}

impl VolumeMeta {
    /// Creates a descriptor with explicit geometry.
    pub fn new(
        dims: [usize; 3],
        spacing: [f32; 3],
        origin: [f32; 3],
        scalar: ScalarKind,
        components: usize,
    ) -> Self {
        Self {
            dims,
            spacing,
            origin,
            scalar,
            components,
        }
    }

    /// Creates a single-component descriptor on a unit grid at the
    /// world origin.
    pub fn contiguous(dims: [usize; 3], scalar: ScalarKind) -> Self {
        Self::new(dims, [1.0; 3], [0.0; 3], scalar, 1)
    }

    /// Checks the descriptor is usable at all.
    pub fn validate(&self) -> PluginResult<()> {
        if self.dims.iter().any(|&d| d == 0) {
            return Err(PluginError::descriptor(format!(
                "dimensions {:?} contain a zero extent",
                self.dims
            )));
        }
        if self.spacing.iter().any(|&s| !(s > 0.0) || !s.is_finite()) {
            return Err(PluginError::descriptor(format!(
                "spacing {:?} must be positive and finite",
                self.spacing
            )));
        }
        if self.origin.iter().any(|&o| !o.is_finite()) {
            return Err(PluginError::descriptor(format!(
                "origin {:?} must be finite",
                self.origin
            )));
        }
        if self.components == 0 {
            return Err(PluginError::descriptor("component count is zero"));
        }
        Ok(())
    }

    /// Number of voxels in the volume.
    pub fn voxel_count(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    /// Number of stored samples (voxels times components).
    pub fn sample_count(&self) -> usize {
        self.voxel_count() * self.components
    }

    /// Byte length a conforming buffer must have.
    pub fn expected_bytes(&self) -> usize {
        self.sample_count() * self.scalar.size_bytes()
    }

    /// Flat voxel index of grid position `(x, y, z)`.
    ///
    /// This is a voxel index; multiply by `components` for the first
    /// sample of an interleaved voxel.
    #[inline]
    pub fn index_of(&self, p: [usize; 3]) -> usize {
        (p[2] * self.dims[1] + p[1]) * self.dims[0] + p[0]
    }

    /// True when `other` lies on the same grid: identical dimensions,
    /// spacing, and origin. Scalar kind and components may differ.
    pub fn same_grid(&self, other: &VolumeMeta) -> bool {
        self.dims == other.dims && self.spacing == other.spacing && self.origin == other.origin
    }

    /// Copy of this descriptor with a different storage layout on the
    /// same grid.
    pub fn with_layout(&self, scalar: ScalarKind, components: usize) -> VolumeMeta {
        VolumeMeta {
            scalar,
            components,
            ..*self
        }
    }
}

fn check_buffer(meta: &VolumeMeta, len: usize, ptr: usize) -> PluginResult<()> {
    meta.validate()?;
    let expected = meta.expected_bytes();
    if len != expected {
        return Err(PluginError::BufferLength {
            expected,
            found: len,
        });
    }
    // Natural alignment: one element size.
    if ptr % meta.scalar.size_bytes() != 0 {
        return Err(PluginError::BufferAlignment { kind: meta.scalar });
    }
    Ok(())
}

/// Read-only view over a host-owned input buffer.
#[derive(Debug, Clone, Copy)]
pub struct VolumeSource<'a> {
    meta: VolumeMeta,
    bytes: &'a [u8],
}

impl<'a> VolumeSource<'a> {
    /// Wraps host bytes, checking descriptor validity, byte length,
    /// and element alignment up front.
    pub fn new(meta: VolumeMeta, bytes: &'a [u8]) -> PluginResult<Self> {
        check_buffer(&meta, bytes.len(), bytes.as_ptr() as usize)?;
        Ok(Self { meta, bytes })
    }

    /// The volume descriptor.
    pub fn meta(&self) -> &VolumeMeta {
        &self.meta
    }

    /// The raw sample bytes.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Zero-copy typed view of the samples.
    ///
    /// The requested element type must match the descriptor's kind;
    /// no conversion happens here.
    pub fn view<T: Scalar>(&self) -> PluginResult<VolumeView<'a, T>> {
        if T::KIND != self.meta.scalar {
            return Err(PluginError::ScalarMismatch {
                actual: self.meta.scalar,
                requested: T::KIND,
            });
        }
        let data = bytemuck::try_cast_slice(self.bytes)
            .map_err(|_| PluginError::BufferAlignment { kind: T::KIND })?;
        Ok(VolumeView {
            meta: self.meta,
            data,
        })
    }

    /// Observed `(min, max)` over all samples, widened to f64.
    ///
    /// Non-finite samples are skipped; a volume with no finite sample
    /// reports `(0.0, 0.0)`.
    pub fn value_range(&self) -> PluginResult<(f64, f64)> {
        dispatch_scalar!(self.meta.scalar, T => {
            let view = self.view::<T>()?;
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            for &v in view.data {
                let v = v.to_f64();
                if !v.is_finite() {
                    continue;
                }
                if v < min {
                    min = v;
                }
                if v > max {
                    max = v;
                }
            }
            if min > max {
                Ok((0.0, 0.0))
            } else {
                Ok((min, max))
            }
        })
    }
}

/// Write-only view over the host-owned output buffer.
///
/// Nothing is written until [`VolumeSink::write_back`] runs; a failed
/// pipeline leaves the host allocation exactly as it was.
#[derive(Debug)]
pub struct VolumeSink<'a> {
    meta: VolumeMeta,
    bytes: &'a mut [u8],
}

impl<'a> VolumeSink<'a> {
    /// Wraps the host output buffer with the same checks as
    /// [`VolumeSource::new`].
    pub fn new(meta: VolumeMeta, bytes: &'a mut [u8]) -> PluginResult<Self> {
        check_buffer(&meta, bytes.len(), bytes.as_ptr() as usize)?;
        Ok(Self { meta, bytes })
    }

    /// The volume descriptor the host negotiated for the output.
    pub fn meta(&self) -> &VolumeMeta {
        &self.meta
    }

    /// Copies a staged result into the host buffer.
    ///
    /// The staged descriptor must agree with the sink's descriptor in
    /// grid, scalar kind, and component count.
    pub fn write_back(&mut self, staged: &VolumeBuffer) -> PluginResult<()> {
        if !self.meta.same_grid(&staged.meta) {
            return Err(PluginError::GridMismatch);
        }
        if self.meta.scalar != staged.meta.scalar || self.meta.components != staged.meta.components
        {
            return Err(PluginError::OutputLayoutMismatch {
                expected_scalar: staged.meta.scalar,
                expected_components: staged.meta.components,
                found_scalar: self.meta.scalar,
                found_components: self.meta.components,
            });
        }
        self.bytes.copy_from_slice(&staged.bytes);
        Ok(())
    }
}

/// Borrowed, typed, shape-aware view of volume samples.
#[derive(Debug, Clone, Copy)]
pub struct VolumeView<'a, T: Scalar> {
    /// Descriptor of the viewed volume.
    pub meta: VolumeMeta,
    /// All samples, interleaved.
    pub data: &'a [T],
}

impl<'a, T: Scalar> VolumeView<'a, T> {
    /// Sample value at a grid position of a single-component volume.
    #[inline]
    pub fn value(&self, p: [usize; 3]) -> T {
        debug_assert_eq!(self.meta.components, 1);
        self.data[self.meta.index_of(p)]
    }

    /// Copies every sample into working precision.
    ///
    /// This is the bridging path for pipelines that do not run on the
    /// stored element type directly.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        self.data.iter().map(|v| v.to_f32()).collect()
    }
}

/// Owned, typed volume produced by a pipeline stage.
#[derive(Debug, Clone)]
pub struct TypedImage<T: Scalar> {
    meta: VolumeMeta,
    data: Vec<T>,
}

impl<T: Scalar> TypedImage<T> {
    /// Wraps owned samples; the descriptor must carry `T`'s kind and
    /// imply exactly `data.len()` samples.
    pub fn new(meta: VolumeMeta, data: Vec<T>) -> PluginResult<Self> {
        if meta.scalar != T::KIND {
            return Err(PluginError::ScalarMismatch {
                actual: meta.scalar,
                requested: T::KIND,
            });
        }
        if meta.sample_count() != data.len() {
            return Err(PluginError::BufferLength {
                expected: meta.expected_bytes(),
                found: data.len() * meta.scalar.size_bytes(),
            });
        }
        Ok(Self { meta, data })
    }

    /// The descriptor.
    pub fn meta(&self) -> &VolumeMeta {
        &self.meta
    }

    /// All samples, interleaved.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Mutable access to the samples.
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consumes the image, returning the raw sample vector.
    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// Erases the element type for write-back staging.
    pub fn into_buffer(self) -> VolumeBuffer {
        VolumeBuffer {
            meta: self.meta,
            bytes: bytemuck::cast_slice(&self.data).to_vec(),
        }
    }
}

/// Owned, type-erased volume staged for write-back.
#[derive(Debug, Clone)]
pub struct VolumeBuffer {
    meta: VolumeMeta,
    bytes: Vec<u8>,
}

impl VolumeBuffer {
    /// The descriptor of the staged volume.
    pub fn meta(&self) -> &VolumeMeta {
        &self.meta
    }

    /// The staged sample bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}
