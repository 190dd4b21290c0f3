//! Inversion and eigen-analysis against analytic results.

use approx::assert_relative_eq;
use optiviz::linalg::mat_vec;
use optiviz::{
    classify, condition_number, eigen_pairs_2x2, eigenvalues_2x2, eigenvalues_3x3, invert_matrix,
    shift_diagonal, symmetric_eigenvalues, Definiteness,
};
use proptest::prelude::*;

// ══════════════════════════════════════════════
//  Inversion
// ══════════════════════════════════════════════

fn mat_mul(a: &[Vec<f64>], b: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = a.len();
    (0..n)
        .map(|i| (0..n).map(|j| (0..n).map(|k| a[i][k] * b[k][j]).sum()).collect())
        .collect()
}

#[test]
fn inverse_of_rosenbrock_hessian_at_minimum() {
    // H(1, 1) = [[802, -400], [-400, 200]], det = 400.
    let h = vec![vec![802.0, -400.0], vec![-400.0, 200.0]];
    let inv = invert_matrix(&h).unwrap();

    assert_relative_eq!(inv[0][0], 0.5, epsilon = 1e-10);
    assert_relative_eq!(inv[0][1], 1.0, epsilon = 1e-10);
    assert_relative_eq!(inv[1][1], 2.005, epsilon = 1e-10);
}

#[test]
fn pivoting_handles_zero_leading_entry() {
    let a = vec![
        vec![0.0, 2.0, 1.0],
        vec![1.0, 0.0, 0.0],
        vec![3.0, 1.0, 4.0],
    ];
    let inv = invert_matrix(&a).unwrap();
    let prod = mat_mul(&a, &inv);
    for (i, row) in prod.iter().enumerate() {
        for (j, &v) in row.iter().enumerate() {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert_relative_eq!(v, expected, epsilon = 1e-12);
        }
    }
}

#[test]
fn damping_rescues_singular_matrix() {
    let a = vec![vec![1.0, 1.0], vec![1.0, 1.0]];
    assert!(invert_matrix(&a).is_none());

    let damped = shift_diagonal(&a, 0.01);
    let inv = invert_matrix(&damped).unwrap();
    let x = mat_vec(&inv, &[1.0, 1.0]);
    // (A + 0.01 I) [1, 1] = 2.01 [1, 1]
    assert_relative_eq!(x[0], 1.0 / 2.01, epsilon = 1e-12);
    assert_relative_eq!(x[1], 1.0 / 2.01, epsilon = 1e-12);
}

// ══════════════════════════════════════════════
//  Eigen-analysis
// ══════════════════════════════════════════════

#[test]
fn eigenvalues_of_coupled_2x2() {
    // [[2, 1], [1, 2]] has eigenvalues 3 and 1.
    let a = vec![vec![2.0, 1.0], vec![1.0, 2.0]];
    let [l1, l2] = eigenvalues_2x2(&a);
    assert_relative_eq!(l1, 3.0, epsilon = 1e-12);
    assert_relative_eq!(l2, 1.0, epsilon = 1e-12);
    assert_relative_eq!(condition_number(&[l1, l2]), 3.0, epsilon = 1e-12);
    assert_eq!(classify(&[l1, l2]), Definiteness::PositiveDefinite);

    let pairs = eigen_pairs_2x2(&a);
    for p in &pairs {
        let av = mat_vec(&a, &p.vector);
        assert_relative_eq!(av[0], p.value * p.vector[0], epsilon = 1e-12);
        assert_relative_eq!(av[1], p.value * p.vector[1], epsilon = 1e-12);
    }
}

#[test]
fn saddle_hessian_is_indefinite() {
    let eig = symmetric_eigenvalues(&[vec![2.0, 0.0], vec![0.0, -2.0]]);
    assert_eq!(classify(&eig), Definiteness::Indefinite);
    assert_eq!(condition_number(&eig), 1.0);
}

#[test]
fn eigenvalues_3x3_known_spectrum() {
    // Tridiagonal [[2,-1,0],[-1,2,-1],[0,-1,2]]: 2 + sqrt(2), 2, 2 - sqrt(2).
    let a = vec![
        vec![2.0, -1.0, 0.0],
        vec![-1.0, 2.0, -1.0],
        vec![0.0, -1.0, 2.0],
    ];
    let eig = eigenvalues_3x3(&a);
    let s = std::f64::consts::SQRT_2;
    assert_relative_eq!(eig[0], 2.0 + s, epsilon = 1e-12);
    assert_relative_eq!(eig[1], 2.0, epsilon = 1e-12);
    assert_relative_eq!(eig[2], 2.0 - s, epsilon = 1e-12);
}

#[test]
fn jacobi_agrees_with_diagonal_4x4() {
    let a = vec![
        vec![4.0, 0.0, 0.0, 0.0],
        vec![0.0, -9.0, 0.0, 0.0],
        vec![0.0, 0.0, 1.0, 0.0],
        vec![0.0, 0.0, 0.0, 2.5],
    ];
    assert_eq!(symmetric_eigenvalues(&a), vec![-9.0, 4.0, 2.5, 1.0]);
}

proptest! {
    #[test]
    fn inverse_times_matrix_is_identity(
        a in 0.5f64..10.0,
        b in -2.0f64..2.0,
        d in 0.5f64..10.0,
    ) {
        // Diagonally dominant symmetric matrices are well conditioned.
        let m = vec![vec![a + 2.0, b], vec![b, d + 2.0]];
        let inv = invert_matrix(&m).unwrap();
        let prod = mat_mul(&m, &inv);
        prop_assert!((prod[0][0] - 1.0).abs() < 1e-12);
        prop_assert!((prod[1][1] - 1.0).abs() < 1e-12);
        prop_assert!(prod[0][1].abs() < 1e-12);
        prop_assert!(prod[1][0].abs() < 1e-12);
    }

    #[test]
    fn eigenvalues_preserve_trace_and_determinant(
        a in -10.0f64..10.0,
        b in -10.0f64..10.0,
        d in -10.0f64..10.0,
    ) {
        let [l1, l2] = eigenvalues_2x2(&[vec![a, b], vec![b, d]]);
        prop_assert!(l1.abs() >= l2.abs());
        prop_assert!((l1 + l2 - (a + d)).abs() < 1e-9);
        prop_assert!((l1 * l2 - (a * d - b * b)).abs() < 1e-8);
    }
}
