use std::fmt::{Debug, Display};

use num_traits::{Float as NumFloat, FloatConst, FromPrimitive};

/// Marker trait for the scalar types the engine runs on (`f32`, `f64`).
///
/// Bundles the numeric and utility traits needed by the linear-algebra
/// primitives and the optimizers built on top of them.
pub trait Float:
    NumFloat + FloatConst + FromPrimitive + Copy + Send + Sync + Default + Debug + Display + 'static
{
    /// Convert an `f64` literal into this scalar type.
    ///
    /// Every constant the engine uses is representable in `f32`, so the
    /// conversion cannot fail for the implementing types.
    fn lit(v: f64) -> Self {
        <Self as FromPrimitive>::from_f64(v).unwrap_or_else(Self::nan)
    }
}

impl Float for f32 {}
impl Float for f64 {}
