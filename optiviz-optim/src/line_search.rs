use optiviz::vector::{axpy, dot};
use optiviz::Float;

use crate::objective::Objective;

/// Parameters for the backtracking Armijo line search.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArmijoParams<F> {
    /// Sufficient decrease parameter (default: 1e-4).
    pub c1: F,
    /// Backtracking factor (default: 0.5).
    pub rho: F,
    /// Number of trial step sizes `1, rho, rho^2, ...` (default: 20).
    pub max_trials: usize,
    /// Number of `(alpha, loss, bound)` samples on `alpha ∈ [0, 1]` to record
    /// for plotting; `None` disables sampling (default).
    pub curve_samples: Option<usize>,
}

impl Default for ArmijoParams<f64> {
    fn default() -> Self {
        ArmijoParams {
            c1: 1e-4,
            rho: 0.5,
            max_trials: 20,
            curve_samples: None,
        }
    }
}

impl Default for ArmijoParams<f32> {
    fn default() -> Self {
        ArmijoParams {
            c1: 1e-4,
            rho: 0.5,
            max_trials: 20,
            curve_samples: None,
        }
    }
}

/// How a driver turns a direction into a step.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StepRule<F> {
    /// Backtracking Armijo line search.
    Armijo(ArmijoParams<F>),
    /// Always take the full unit step `w + p`.
    FullStep,
}

/// Whether the accepted step satisfied the Armijo condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LineSearchStatus {
    Satisfied,
    /// No trial satisfied the condition; the smallest trial was accepted.
    Exhausted,
}

/// One evaluated trial step.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(bound = "F: optiviz::serde_float::FloatWire"))]
pub struct LineSearchTrial<F> {
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub alpha: F,
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub loss: F,
    /// `f(w) + c1 * alpha * p·g`.
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub armijo_bound: F,
    pub satisfied: bool,
}

/// A sample of the loss along the search ray.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(bound = "F: optiviz::serde_float::FloatWire"))]
pub struct CurvePoint<F> {
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub alpha: F,
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub loss: F,
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub armijo_bound: F,
}

/// Diagnostics kept on each iteration record.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(bound = "F: optiviz::serde_float::FloatWire"))]
pub struct LineSearchTrace<F> {
    pub status: LineSearchStatus,
    pub trials: Vec<LineSearchTrial<F>>,
    pub curve: Option<Vec<CurvePoint<F>>>,
}

/// Result of a line search.
#[derive(Debug)]
pub struct LineSearchResult<F> {
    /// The accepted step size.
    pub alpha: F,
    /// `w + alpha * p`.
    pub w_new: Vec<F>,
    /// Objective value at `w_new`.
    pub value: F,
    /// Gradient at `w_new`.
    pub gradient: Vec<F>,
    /// Number of objective/gradient evaluations, excluding curve samples.
    pub evals: usize,
    pub trace: LineSearchTrace<F>,
}

/// Backtracking line search on the Armijo (sufficient decrease) condition.
///
/// Tries `alpha = rho^k` for `k = 0, 1, ..., max_trials - 1` and accepts the
/// first that satisfies `f(w + alpha*p) <= f(w) + c1 * alpha * p·g`.
///
/// If no trial satisfies the condition, the last (smallest) trial is accepted
/// anyway and the trace is tagged [`LineSearchStatus::Exhausted`]. The
/// direction is not required to be a descent direction.
pub fn backtracking_armijo<F: Float, O: Objective<F>>(
    obj: &O,
    w: &[F],
    p: &[F],
    f_w: F,
    grad_w: &[F],
    params: &ArmijoParams<F>,
) -> LineSearchResult<F> {
    let dg = dot(p, grad_w);
    let max_trials = params.max_trials.max(1);

    let curve = params
        .curve_samples
        .map(|n| sample_curve(obj, w, p, f_w, dg, params.c1, n));

    let mut alpha = F::one();
    let mut trials = Vec::with_capacity(max_trials);
    let mut k = 0;

    loop {
        let w_new = axpy(alpha, p, w);
        let (f_new, g_new) = obj.eval_grad(&w_new);
        let armijo_bound = f_w + params.c1 * alpha * dg;
        let satisfied = f_new <= armijo_bound;
        trials.push(LineSearchTrial {
            alpha,
            loss: f_new,
            armijo_bound,
            satisfied,
        });
        k += 1;

        if satisfied || k == max_trials {
            let status = if satisfied {
                LineSearchStatus::Satisfied
            } else {
                LineSearchStatus::Exhausted
            };
            return LineSearchResult {
                alpha,
                w_new,
                value: f_new,
                gradient: g_new,
                evals: k,
                trace: LineSearchTrace {
                    status,
                    trials,
                    curve,
                },
            };
        }

        alpha = alpha * params.rho;
    }
}

fn sample_curve<F: Float, O: Objective<F>>(
    obj: &O,
    w: &[F],
    p: &[F],
    f_w: F,
    dg: F,
    c1: F,
    samples: usize,
) -> Vec<CurvePoint<F>> {
    if samples == 0 {
        return Vec::new();
    }
    let denom = F::from_usize(samples.saturating_sub(1).max(1)).unwrap_or_else(F::one);
    (0..samples)
        .map(|i| {
            let alpha = F::from_usize(i).unwrap_or_else(F::zero) / denom;
            CurvePoint {
                alpha,
                loss: obj.value(&axpy(alpha, p, w)),
                armijo_bound: f_w + c1 * alpha * dg,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Simple quadratic objective for testing: f(x) = 0.5 * (x0^2 + x1^2)
    struct Quadratic;

    impl Objective<f64> for Quadratic {
        fn dim(&self) -> usize {
            2
        }

        fn value(&self, x: &[f64]) -> f64 {
            0.5 * (x[0] * x[0] + x[1] * x[1])
        }

        fn gradient(&self, x: &[f64]) -> Vec<f64> {
            vec![x[0], x[1]]
        }
    }

    #[test]
    fn armijo_full_step_on_quadratic() {
        let obj = Quadratic;
        let x = vec![2.0, 3.0];
        let (f_x, grad) = obj.eval_grad(&x);
        let d: Vec<f64> = grad.iter().map(|&g| -g).collect();

        let result = backtracking_armijo(&obj, &x, &d, f_x, &grad, &ArmijoParams::default());

        // For a quadratic, steepest descent with alpha=1 satisfies Armijo with c=1e-4
        assert_eq!(result.alpha, 1.0);
        assert_eq!(result.evals, 1);
        assert_eq!(result.trace.status, LineSearchStatus::Satisfied);
        assert_eq!(result.w_new, vec![0.0, 0.0]);
        assert!(result.value < f_x, "line search should decrease objective");
    }

    #[test]
    fn armijo_backtracks_on_overshoot() {
        let obj = Quadratic;
        let x = vec![2.0, 3.0];
        let (f_x, grad) = obj.eval_grad(&x);
        // Four times the steepest descent step: alpha=1 lands at -3x, alpha=0.5 at -x,
        // alpha=0.25 at the minimum.
        let d: Vec<f64> = grad.iter().map(|&g| -4.0 * g).collect();

        let result = backtracking_armijo(&obj, &x, &d, f_x, &grad, &ArmijoParams::default());

        assert_eq!(result.alpha, 0.25);
        assert_eq!(result.trace.trials.len(), 3);
        assert!(!result.trace.trials[0].satisfied);
        assert!(!result.trace.trials[1].satisfied);
        assert!(result.trace.trials[2].satisfied);
    }

    #[test]
    fn ascent_direction_exhausts_and_accepts_smallest_trial() {
        let obj = Quadratic;
        let x = vec![2.0, 3.0];
        let (f_x, grad) = obj.eval_grad(&x);
        let d = grad.clone();

        let result = backtracking_armijo(&obj, &x, &d, f_x, &grad, &ArmijoParams::default());

        assert_eq!(result.trace.status, LineSearchStatus::Exhausted);
        assert_eq!(result.trace.trials.len(), 20);
        assert_eq!(result.alpha, 0.5_f64.powi(19));
        assert!(result.value > f_x);
    }

    #[test]
    fn curve_sampling_spans_unit_interval() {
        let obj = Quadratic;
        let x = vec![2.0, 3.0];
        let (f_x, grad) = obj.eval_grad(&x);
        let d: Vec<f64> = grad.iter().map(|&g| -g).collect();
        let params = ArmijoParams {
            curve_samples: Some(5),
            ..Default::default()
        };

        let result = backtracking_armijo(&obj, &x, &d, f_x, &grad, &params);
        let curve = result.trace.curve.unwrap();

        assert_eq!(curve.len(), 5);
        assert_eq!(curve[0].alpha, 0.0);
        assert_eq!(curve[0].loss, f_x);
        assert_eq!(curve[4].alpha, 1.0);
        assert_eq!(curve[2].alpha, 0.5);
        // Curve samples do not count as line-search evaluations.
        assert_eq!(result.evals, 1);
    }
}
