//! Element traits for mapping Rust types to DType

use super::DType;
use bytemuck::{Pod, Zeroable};
use num_traits::{NumCast, PrimInt, ToPrimitive};
use std::fmt::Debug;
use std::ops::{Add, Div, Mul, Sub};

/// Rust types a tensor buffer can hold, tagged with their runtime [`DType`]
///
/// Both value types ([`Element`]) and index types ([`IndexElement`]) build on
/// this, so any buffer of either kind reports its dtype the same way.
///
/// # Bounds
/// - `Copy + Clone + Send + Sync + 'static` - Basic trait requirements
/// - `Pod + Zeroable` - Safe memory transmutation (bytemuck)
pub trait TensorScalar: Copy + Clone + Debug + Send + Sync + Pod + Zeroable + 'static {
    /// The corresponding DType for this Rust type
    const DTYPE: DType;
}

macro_rules! impl_tensor_scalar {
    ($($t:ty => $dtype:ident),* $(,)?) => {
        $(
            impl TensorScalar for $t {
                const DTYPE: DType = DType::$dtype;
            }
        )*
    };
}

impl_tensor_scalar!(f64 => F64, f32 => F32, i64 => I64, i32 => I32);

#[cfg(feature = "f16")]
impl_tensor_scalar!(half::f16 => F16, half::bf16 => BF16);

/// Trait for types that can be values of a sparse or dense tensor
///
/// # Bounds
/// - `TensorScalar` - Storage and dtype tag
/// - `Add + Sub + Mul + Div` - Arithmetic operations (Output = Self)
/// - `PartialOrd` - Comparison for amax/amin reductions
pub trait Element:
    TensorScalar
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + PartialOrd
{
    /// Convert to f64 for generic numeric operations
    fn to_f64(self) -> f64;

    /// Convert from f64 to this type
    fn from_f64(v: f64) -> Self;

    /// Zero value
    fn zero() -> Self;

    /// Returns true if the value is NaN
    #[inline]
    fn is_nan(self) -> bool {
        self.to_f64().is_nan()
    }
}

impl Element for f64 {
    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }

    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn is_nan(self) -> bool {
        f64::is_nan(self)
    }
}

impl Element for f32 {
    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v as f32
    }

    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn is_nan(self) -> bool {
        f32::is_nan(self)
    }
}

#[cfg(feature = "f16")]
impl Element for half::f16 {
    #[inline]
    fn to_f64(self) -> f64 {
        half::f16::to_f64(self)
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        half::f16::from_f64(v)
    }

    #[inline]
    fn zero() -> Self {
        half::f16::ZERO
    }
}

#[cfg(feature = "f16")]
impl Element for half::bf16 {
    #[inline]
    fn to_f64(self) -> f64 {
        half::bf16::to_f64(self)
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        half::bf16::from_f64(v)
    }

    #[inline]
    fn zero() -> Self {
        half::bf16::ZERO
    }
}

/// Trait for integer types used by sparse index arrays
/// (`crow_indices`, `col_indices`, `row_indices`, `ccol_indices`, `csr2csc`)
pub trait IndexElement: TensorScalar + PrimInt + NumCast + ToPrimitive {
    /// Convert a non-negative index to `usize`
    ///
    /// Returns `None` for negative values or values that do not fit.
    #[inline]
    fn to_index(self) -> Option<usize> {
        self.to_usize()
    }

    /// Convert a `usize` position into this index type
    ///
    /// Returns `None` if the position does not fit.
    #[inline]
    fn from_index(v: usize) -> Option<Self> {
        <Self as NumCast>::from(v)
    }
}

impl IndexElement for i64 {}

impl IndexElement for i32 {}
