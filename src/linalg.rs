//! Small dense matrix primitives.
//!
//! Matrices are stored row-major as `Vec<Vec<F>>` (`a[row][col]`). The sizes
//! involved are tiny (d = 2 or 3 in practice), so nothing here tries to be
//! cache-friendly.

use crate::float::Float;
use crate::vector::dot;

/// Absolute floor on the pivot magnitude used by [`invert_matrix`].
pub const PIVOT_FLOOR: f64 = 1e-10;

/// Pivot threshold relative to the Frobenius norm of the input.
pub const PIVOT_RELATIVE: f64 = 1e-12;

/// `n x n` identity matrix.
pub fn identity<F: Float>(n: usize) -> Vec<Vec<F>> {
    let mut m = vec![vec![F::zero(); n]; n];
    for (i, row) in m.iter_mut().enumerate() {
        row[i] = F::one();
    }
    m
}

/// Frobenius norm `sqrt(sum a_ij^2)`.
pub fn frobenius_norm<F: Float>(a: &[Vec<F>]) -> F {
    let mut s = F::zero();
    for row in a {
        for &v in row {
            s = s + v * v;
        }
    }
    s.sqrt()
}

/// Matrix-vector product `A * v`.
pub fn mat_vec<F: Float>(a: &[Vec<F>], v: &[F]) -> Vec<F> {
    a.iter().map(|row| dot(row, v)).collect()
}

/// Main diagonal of a square matrix.
pub fn diagonal<F: Float>(a: &[Vec<F>]) -> Vec<F> {
    a.iter().enumerate().map(|(i, row)| row[i]).collect()
}

/// `A + shift * I`.
///
/// This is the Levenberg-Marquardt style damping applied to Hessians before
/// inversion.
pub fn shift_diagonal<F: Float>(a: &[Vec<F>], shift: F) -> Vec<Vec<F>> {
    let mut out = a.to_vec();
    for (i, row) in out.iter_mut().enumerate() {
        row[i] = row[i] + shift;
    }
    out
}

/// Invert an `n x n` matrix by Gauss-Jordan elimination with partial pivoting.
///
/// Elimination runs on the augmented matrix `[A | I]`. The matrix is declared
/// singular, and `None` returned, when the largest available pivot in a column
/// has magnitude below `max(1e-10, ||A||_F * 1e-12)`. The threshold scales
/// with the matrix so that uniformly tiny but well-conditioned matrices are
/// still invertible. Non-finite pivots are also reported as singular.
// Explicit indexing is clearer for pivoted elimination over two column blocks
#[allow(clippy::needless_range_loop)]
pub fn invert_matrix<F: Float>(a: &[Vec<F>]) -> Option<Vec<Vec<F>>> {
    let n = a.len();
    debug_assert!(a.iter().all(|row| row.len() == n));

    let threshold = F::lit(PIVOT_FLOOR).max(frobenius_norm(a) * F::lit(PIVOT_RELATIVE));

    let mut aug: Vec<Vec<F>> = a
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut r = Vec::with_capacity(2 * n);
            r.extend_from_slice(row);
            r.extend((0..n).map(|j| if i == j { F::one() } else { F::zero() }));
            r
        })
        .collect();

    for col in 0..n {
        let mut max_val = aug[col][col].abs();
        let mut max_row = col;
        for row in (col + 1)..n {
            let v = aug[row][col].abs();
            if v > max_val {
                max_val = v;
                max_row = row;
            }
        }

        if max_val.is_nan() || max_val < threshold {
            return None;
        }

        if max_row != col {
            aug.swap(col, max_row);
        }

        let inv_pivot = F::one() / aug[col][col];
        for j in 0..2 * n {
            aug[col][j] = aug[col][j] * inv_pivot;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = aug[row][col];
            if factor == F::zero() {
                continue;
            }
            for j in 0..2 * n {
                let v = aug[col][j];
                aug[row][j] = aug[row][j] - factor * v;
            }
        }
    }

    Some(aug.into_iter().map(|row| row[n..].to_vec()).collect())
}
