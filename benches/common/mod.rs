// ─── Test matrices ─────────────────────────────────────────────────────────

/// Symmetric, diagonally dominant `n x n` matrix with a deterministic pattern.
pub fn spd_matrix(n: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| {
            (0..n)
                .map(|j| {
                    if i == j {
                        2.0 * n as f64 + i as f64
                    } else {
                        1.0 / (1.0 + (i + j) as f64)
                    }
                })
                .collect()
        })
        .collect()
}

/// Rosenbrock Hessian at `(x, y)`.
pub fn rosenbrock_hessian(x: f64, y: f64) -> Vec<Vec<f64>> {
    let h01 = -400.0 * x;
    vec![vec![2.0 - 400.0 * (y - 3.0 * x * x), h01], vec![h01, 200.0]]
}
