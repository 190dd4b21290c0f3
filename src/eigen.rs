//! Eigen-analysis of small symmetric matrices.
//!
//! Used for Hessian diagnostics: condition numbers, saddle-point detection,
//! and comparing quasi-Newton Hessian approximations against the true one.
//! Every routine returns eigenvalues sorted by descending magnitude.

use std::cmp::Ordering;

use crate::float::Float;
use crate::linalg::frobenius_norm;

/// `|lambda_min|` below this makes the condition number infinite.
pub const CONDITION_EPS: f64 = 1e-15;

/// Eigenvalues with magnitude below this are treated as zero when classifying
/// definiteness.
pub const DEFINITENESS_EPS: f64 = 1e-10;

const JACOBI_MAX_SWEEPS: usize = 100;

/// An eigenvalue with its unit eigenvector.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(bound = "F: crate::serde_float::FloatWire"))]
pub struct EigenPair<F> {
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_float"))]
    pub value: F,
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_float"))]
    pub vector: Vec<F>,
}

/// Sign structure of a symmetric matrix's spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Definiteness {
    /// All eigenvalues above the threshold.
    PositiveDefinite,
    /// All eigenvalues below minus the threshold.
    NegativeDefinite,
    /// Eigenvalues of both signs: the point is a saddle.
    Indefinite,
    /// At least one eigenvalue within the threshold of zero and no sign mix.
    Singular,
}

fn by_descending_magnitude<F: Float>(a: &F, b: &F) -> Ordering {
    b.abs().partial_cmp(&a.abs()).unwrap_or(Ordering::Equal)
}

/// Closed-form eigenvalues of a symmetric 2x2 matrix.
///
/// `lambda = (tr +- sqrt(tr^2 - 4 det)) / 2`. A negative discriminant can only
/// come from rounding for symmetric input, so both eigenvalues are clamped to
/// `tr / 2` in that case. The off-diagonal entry is taken as the mean of
/// `a[0][1]` and `a[1][0]`.
pub fn eigenvalues_2x2<F: Float>(a: &[Vec<F>]) -> [F; 2] {
    let [first, second] = eigen_pairs_2x2(a);
    [first.value, second.value]
}

/// Closed-form eigen-pairs of a symmetric 2x2 matrix, sorted by descending
/// eigenvalue magnitude.
pub fn eigen_pairs_2x2<F: Float>(a: &[Vec<F>]) -> [EigenPair<F>; 2] {
    debug_assert!(a.len() == 2 && a[0].len() == 2 && a[1].len() == 2);
    let two = F::lit(2.0);
    let (p, d) = (a[0][0], a[1][1]);
    let b = (a[0][1] + a[1][0]) / two;

    let e0 = vec![F::one(), F::zero()];
    let e1 = vec![F::zero(), F::one()];

    if b == F::zero() {
        let mut pairs = [
            EigenPair { value: p, vector: e0 },
            EigenPair { value: d, vector: e1 },
        ];
        pairs.sort_by(|x, y| by_descending_magnitude(&x.value, &y.value));
        return pairs;
    }

    let trace = p + d;
    let det = p * d - b * b;
    let disc = trace * trace - F::lit(4.0) * det;

    if disc < F::zero() {
        let half = trace / two;
        return [
            EigenPair { value: half, vector: e0 },
            EigenPair { value: half, vector: e1 },
        ];
    }

    let root = disc.sqrt();
    let l1 = (trace + root) / two;
    let l2 = (trace - root) / two;

    // (A - lambda I) v = 0  =>  v = (b, lambda - a)
    let vector_for = |lambda: F| {
        let v = [b, lambda - p];
        let n = (v[0] * v[0] + v[1] * v[1]).sqrt();
        vec![v[0] / n, v[1] / n]
    };

    let mut pairs = [
        EigenPair {
            value: l1,
            vector: vector_for(l1),
        },
        EigenPair {
            value: l2,
            vector: vector_for(l2),
        },
    ];
    pairs.sort_by(|x, y| by_descending_magnitude(&x.value, &y.value));
    pairs
}

/// Closed-form eigenvalues of a symmetric 3x3 matrix (trigonometric method).
pub fn eigenvalues_3x3<F: Float>(a: &[Vec<F>]) -> [F; 3] {
    debug_assert!(a.len() == 3 && a.iter().all(|r| r.len() == 3));
    let two = F::lit(2.0);
    let three = F::lit(3.0);
    let sym = |i: usize, j: usize| (a[i][j] + a[j][i]) / two;

    let (a00, a11, a22) = (a[0][0], a[1][1], a[2][2]);
    let (a01, a02, a12) = (sym(0, 1), sym(0, 2), sym(1, 2));

    let p1 = a01 * a01 + a02 * a02 + a12 * a12;
    let mut eig = if p1 == F::zero() {
        [a00, a11, a22]
    } else {
        let trace = a00 + a11 + a22;
        let q = trace / three;
        let p2 = (a00 - q).powi(2) + (a11 - q).powi(2) + (a22 - q).powi(2) + two * p1;
        let p = (p2 / F::lit(6.0)).sqrt();

        // B = (A - qI) / p, r = det(B) / 2
        let b00 = (a00 - q) / p;
        let b11 = (a11 - q) / p;
        let b22 = (a22 - q) / p;
        let b01 = a01 / p;
        let b02 = a02 / p;
        let b12 = a12 / p;
        let det_b = b00 * (b11 * b22 - b12 * b12) - b01 * (b01 * b22 - b12 * b02)
            + b02 * (b01 * b12 - b11 * b02);
        let r = (det_b / two).max(-F::one()).min(F::one());

        let phi = r.acos() / three;
        let l1 = q + two * p * phi.cos();
        let l2 = q + two * p * (phi + two * F::PI() / three).cos();
        [l1, l2, trace - l1 - l2]
    };
    eig.sort_by(by_descending_magnitude);
    eig
}

/// Eigenvalues of a symmetric `n x n` matrix by cyclic Jacobi rotations.
///
/// Works for any `n`; [`symmetric_eigenvalues`] only falls back to it for
/// `n > 3`.
// Rotations update rows p and q and columns p and q by index
#[allow(clippy::needless_range_loop)]
pub fn jacobi_eigenvalues<F: Float>(a: &[Vec<F>]) -> Vec<F> {
    let n = a.len();
    let two = F::lit(2.0);
    let mut m: Vec<Vec<F>> = (0..n)
        .map(|i| (0..n).map(|j| (a[i][j] + a[j][i]) / two).collect())
        .collect();

    let scale = frobenius_norm(&m);
    let tol = F::epsilon() * F::epsilon() * scale * scale;

    for _ in 0..JACOBI_MAX_SWEEPS {
        let mut off = F::zero();
        for p in 0..n {
            for q in (p + 1)..n {
                off = off + m[p][q] * m[p][q];
            }
        }
        if off <= tol {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = m[p][q];
                if apq == F::zero() {
                    continue;
                }
                let theta = (m[q][q] - m[p][p]) / (two * apq);
                let sign = if theta >= F::zero() {
                    F::one()
                } else {
                    -F::one()
                };
                let t = sign / (theta.abs() + (theta * theta + F::one()).sqrt());
                let c = F::one() / (t * t + F::one()).sqrt();
                let s = t * c;

                for k in 0..n {
                    let mkp = m[k][p];
                    let mkq = m[k][q];
                    m[k][p] = c * mkp - s * mkq;
                    m[k][q] = s * mkp + c * mkq;
                }
                for k in 0..n {
                    let mpk = m[p][k];
                    let mqk = m[q][k];
                    m[p][k] = c * mpk - s * mqk;
                    m[q][k] = s * mpk + c * mqk;
                }
            }
        }
    }

    let mut eig: Vec<F> = (0..n).map(|i| m[i][i]).collect();
    eig.sort_by(by_descending_magnitude);
    eig
}

/// Eigenvalues of a symmetric matrix of any size, sorted by descending
/// magnitude. Uses the closed forms for `n <= 3`.
pub fn symmetric_eigenvalues<F: Float>(a: &[Vec<F>]) -> Vec<F> {
    match a.len() {
        0 => Vec::new(),
        1 => vec![a[0][0]],
        2 => eigenvalues_2x2(a).to_vec(),
        3 => eigenvalues_3x3(a).to_vec(),
        _ => jacobi_eigenvalues(a),
    }
}

/// `|lambda_max| / |lambda_min|` over the given eigenvalues.
///
/// Infinite when the smallest magnitude is below `1e-15`; NaN for an empty
/// slice.
pub fn condition_number<F: Float>(eigenvalues: &[F]) -> F {
    if eigenvalues.is_empty() {
        return F::nan();
    }
    let max = eigenvalues.iter().fold(F::zero(), |m, &v| m.max(v.abs()));
    let min = eigenvalues
        .iter()
        .fold(F::infinity(), |m, &v| m.min(v.abs()));
    if min < F::lit(CONDITION_EPS) {
        F::infinity()
    } else {
        max / min
    }
}

/// Classify the spectrum of a symmetric matrix.
pub fn classify<F: Float>(eigenvalues: &[F]) -> Definiteness {
    let eps = F::lit(DEFINITENESS_EPS);
    let any_pos = eigenvalues.iter().any(|&v| v > eps);
    let any_neg = eigenvalues.iter().any(|&v| v < -eps);
    let all_pos = eigenvalues.iter().all(|&v| v > eps);
    let all_neg = eigenvalues.iter().all(|&v| v < -eps);

    if all_pos {
        Definiteness::PositiveDefinite
    } else if all_neg {
        Definiteness::NegativeDefinite
    } else if any_pos && any_neg {
        Definiteness::Indefinite
    } else {
        Definiteness::Singular
    }
}
