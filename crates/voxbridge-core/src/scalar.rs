//! Scalar element kinds and runtime-to-monomorphic dispatch.
//!
//! Host volumes arrive with their element type known only at runtime.
//! [`ScalarKind`] is the closed set of kinds the bridge accepts, and
//! [`dispatch_scalar!`](crate::dispatch_scalar) expands a runtime kind
//! into exactly one statically-typed code path, so the numeric kernels
//! are always compiled against a concrete element type.

use bytemuck::Pod;
use serde::{Deserialize, Serialize};

/// The closed set of element kinds a host volume may use.
///
/// The set is fixed; there is no "unknown" variant. Matches over it are
/// exhaustive, so adding a kind forces every dispatch site to handle it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
}

impl ScalarKind {
    /// Every supported kind, in declaration order.
    pub const ALL: [ScalarKind; 10] = [
        ScalarKind::Int8,
        ScalarKind::UInt8,
        ScalarKind::Int16,
        ScalarKind::UInt16,
        ScalarKind::Int32,
        ScalarKind::UInt32,
        ScalarKind::Int64,
        ScalarKind::UInt64,
        ScalarKind::Float32,
        ScalarKind::Float64,
    ];

    /// Size of one element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            ScalarKind::Int8 | ScalarKind::UInt8 => 1,
            ScalarKind::Int16 | ScalarKind::UInt16 => 2,
            ScalarKind::Int32 | ScalarKind::UInt32 | ScalarKind::Float32 => 4,
            ScalarKind::Int64 | ScalarKind::UInt64 | ScalarKind::Float64 => 8,
        }
    }

    /// True for the two floating-point kinds.
    pub fn is_float(self) -> bool {
        matches!(self, ScalarKind::Float32 | ScalarKind::Float64)
    }

    /// Lowercase kind name, identical to the serialized form.
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Int8 => "int8",
            ScalarKind::UInt8 => "uint8",
            ScalarKind::Int16 => "int16",
            ScalarKind::UInt16 => "uint16",
            ScalarKind::Int32 => "int32",
            ScalarKind::UInt32 => "uint32",
            ScalarKind::Int64 => "int64",
            ScalarKind::UInt64 => "uint64",
            ScalarKind::Float32 => "float32",
            ScalarKind::Float64 => "float64",
        }
    }
}

impl std::fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A concrete element type a volume buffer can be viewed as.
///
/// Implemented for exactly the ten primitives named by [`ScalarKind`].
/// The `Pod` bound is what makes reinterpreting host byte buffers as
/// element slices sound.
pub trait Scalar: Pod + Copy + PartialOrd + Send + Sync + 'static {
    /// The runtime kind tag for this type.
    const KIND: ScalarKind;

    /// Widens to the internal working precision.
    fn to_f32(self) -> f32;

    /// Widens without precision loss for statistics.
    fn to_f64(self) -> f64;

    /// Converts back from working precision.
    ///
    /// Integer kinds round to nearest with ties away from zero and
    /// saturate at their representable range; NaN becomes zero. Float
    /// kinds convert with plain IEEE semantics and keep their
    /// fractional part.
    fn from_f32_clamped(v: f32) -> Self;

    /// Same contract as [`Scalar::from_f32_clamped`] at f64 precision.
    fn from_f64_clamped(v: f64) -> Self;
}

macro_rules! impl_scalar_int {
    ($ty:ty, $kind:expr) => {
        impl Scalar for $ty {
            const KIND: ScalarKind = $kind;

            #[inline]
            fn to_f32(self) -> f32 {
                self as f32
            }

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f32_clamped(v: f32) -> Self {
                // `as` saturates at the target range and maps NaN to 0.
                v.round() as $ty
            }

            #[inline]
            fn from_f64_clamped(v: f64) -> Self {
                v.round() as $ty
            }
        }
    };
}

macro_rules! impl_scalar_float {
    ($ty:ty, $kind:expr) => {
        impl Scalar for $ty {
            const KIND: ScalarKind = $kind;

            #[inline]
            fn to_f32(self) -> f32 {
                self as f32
            }

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f32_clamped(v: f32) -> Self {
                v as $ty
            }

            #[inline]
            fn from_f64_clamped(v: f64) -> Self {
                v as $ty
            }
        }
    };
}

impl_scalar_int!(i8, ScalarKind::Int8);
impl_scalar_int!(u8, ScalarKind::UInt8);
impl_scalar_int!(i16, ScalarKind::Int16);
impl_scalar_int!(u16, ScalarKind::UInt16);
impl_scalar_int!(i32, ScalarKind::Int32);
impl_scalar_int!(u32, ScalarKind::UInt32);
impl_scalar_int!(i64, ScalarKind::Int64);
impl_scalar_int!(u64, ScalarKind::UInt64);
impl_scalar_float!(f32, ScalarKind::Float32);
impl_scalar_float!(f64, ScalarKind::Float64);

/// Expands a runtime [`ScalarKind`] into one monomorphic code path.
///
/// The body is compiled once per kind with `$t` bound to the concrete
/// element type, so every arm is a fully specialized instantiation and
/// the match stays exhaustive over the closed kind set. The body must
/// produce the same (type-erased) result type in every arm.
///
/// ```
/// use voxbridge_core::dispatch_scalar;
/// use voxbridge_core::scalar::{Scalar, ScalarKind};
///
/// let kind = ScalarKind::UInt16;
/// let size = dispatch_scalar!(kind, T => std::mem::size_of::<T>());
/// assert_eq!(size, 2);
/// ```
#[macro_export]
macro_rules! dispatch_scalar {
    ($kind:expr, $t:ident => $body:expr) => {{
        match $kind {
            $crate::scalar::ScalarKind::Int8 => {
                type $t = i8;
                $body
            }
            $crate::scalar::ScalarKind::UInt8 => {
                type $t = u8;
                $body
            }
            $crate::scalar::ScalarKind::Int16 => {
                type $t = i16;
                $body
            }
            $crate::scalar::ScalarKind::UInt16 => {
                type $t = u16;
                $body
            }
            $crate::scalar::ScalarKind::Int32 => {
                type $t = i32;
                $body
            }
            $crate::scalar::ScalarKind::UInt32 => {
                type $t = u32;
                $body
            }
            $crate::scalar::ScalarKind::Int64 => {
                type $t = i64;
                $body
            }
            $crate::scalar::ScalarKind::UInt64 => {
                type $t = u64;
                $body
            }
            $crate::scalar::ScalarKind::Float32 => {
                type $t = f32;
                $body
            }
            $crate::scalar::ScalarKind::Float64 => {
                type $t = f64;
                $body
            }
        }
    }};
}
