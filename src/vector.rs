//! Dense vector arithmetic on slices.
//!
//! All functions are pure and allocate their result. Length mismatches are
//! programmer errors and are caught by `debug_assert!` only.

use crate::float::Float;

/// Dot product of two vectors.
pub fn dot<F: Float>(a: &[F], b: &[F]) -> F {
    debug_assert_eq!(a.len(), b.len());
    let mut s = F::zero();
    for i in 0..a.len() {
        s = s + a[i] * b[i];
    }
    s
}

/// Euclidean (L2) norm.
pub fn norm<F: Float>(v: &[F]) -> F {
    let mut s = F::zero();
    for &x in v {
        s = s + x * x;
    }
    s.sqrt()
}

/// L1 norm: sum of absolute values.
pub fn norm_l1<F: Float>(v: &[F]) -> F {
    v.iter().fold(F::zero(), |acc, &x| acc + x.abs())
}

/// Element-wise `a + b`.
pub fn add<F: Float>(a: &[F], b: &[F]) -> Vec<F> {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(&x, &y)| x + y).collect()
}

/// Element-wise `a - b`.
pub fn sub<F: Float>(a: &[F], b: &[F]) -> Vec<F> {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(&x, &y)| x - y).collect()
}

/// `s * v`.
pub fn scale<F: Float>(v: &[F], s: F) -> Vec<F> {
    v.iter().map(|&x| s * x).collect()
}

/// `x + alpha * d`, the point reached by a step of length `alpha` along `d`.
pub fn axpy<F: Float>(alpha: F, d: &[F], x: &[F]) -> Vec<F> {
    debug_assert_eq!(d.len(), x.len());
    x.iter().zip(d).map(|(&xi, &di)| xi + alpha * di).collect()
}

/// `-v`.
pub fn neg<F: Float>(v: &[F]) -> Vec<F> {
    v.iter().map(|&x| -x).collect()
}
