use optiviz::vector::{neg, norm};
use optiviz::Float;

use crate::convergence::{AlgorithmOrder, ConvergenceParams};
use crate::error::OptimError;
use crate::line_search::{ArmijoParams, StepRule};
use crate::objective::Objective;
use crate::result::{AlgorithmResult, IterationRecord};
use crate::solvers::{
    fixed_step, starting_point, take_step, validate_armijo, validate_max_iter, Run, StepOutcome,
};

/// Result of either gradient descent driver. No per-iteration payload.
pub type GradientDescentResult<F> = AlgorithmResult<F, ()>;

/// Configuration for fixed-step gradient descent.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GradientDescentConfig<F> {
    /// Constant step size (default: 0.1).
    pub alpha: F,
    /// Convergence parameters.
    pub convergence: ConvergenceParams<F>,
}

impl Default for GradientDescentConfig<f64> {
    fn default() -> Self {
        GradientDescentConfig {
            alpha: 0.1,
            convergence: ConvergenceParams::default(),
        }
    }
}

impl Default for GradientDescentConfig<f32> {
    fn default() -> Self {
        GradientDescentConfig {
            alpha: 0.1,
            convergence: ConvergenceParams::default(),
        }
    }
}

/// Configuration for gradient descent with Armijo line search.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineSearchGdConfig<F> {
    /// Convergence parameters.
    pub convergence: ConvergenceParams<F>,
    /// Line search parameters.
    pub line_search: ArmijoParams<F>,
}

impl Default for LineSearchGdConfig<f64> {
    fn default() -> Self {
        LineSearchGdConfig {
            convergence: ConvergenceParams::default(),
            line_search: ArmijoParams::default(),
        }
    }
}

impl Default for LineSearchGdConfig<f32> {
    fn default() -> Self {
        LineSearchGdConfig {
            convergence: ConvergenceParams::default(),
            line_search: ArmijoParams::default(),
        }
    }
}

/// Fixed-step gradient descent: `w <- w - alpha * ∇f(w)`.
///
/// The simplest baseline. No curvature information is used, so a step size
/// that is too large for the problem's largest curvature oscillates or
/// diverges; divergence is reported in the summary, not as an error.
///
/// Stops only on the gradient tolerance, divergence or `max_iter`. The
/// `ftol` and `xtol` thresholds in `config` are ignored.
pub fn gradient_descent<F: Float, O: Objective<F>>(
    obj: &O,
    x0: &[F],
    config: &GradientDescentConfig<F>,
) -> Result<GradientDescentResult<F>, OptimError> {
    if config.alpha.is_nan() || config.alpha <= F::zero() {
        return Err(OptimError::InvalidParameter {
            name: "alpha",
            reason: "must be positive",
        });
    }
    let alpha = config.alpha;
    let convergence = ConvergenceParams {
        max_iter: config.convergence.max_iter,
        tolerances: config.convergence.tolerances.gradient_only(),
    };
    descend(obj, x0, &convergence, |w, p, _, _| {
        fixed_step(obj, w, p, alpha)
    })
}

/// Steepest descent with a backtracking Armijo line search choosing the step
/// size each iteration.
pub fn gradient_descent_line_search<F: Float, O: Objective<F>>(
    obj: &O,
    x0: &[F],
    config: &LineSearchGdConfig<F>,
) -> Result<GradientDescentResult<F>, OptimError> {
    validate_armijo(&config.line_search)?;
    let rule = StepRule::Armijo(config.line_search.clone());
    descend(obj, x0, &config.convergence, |w, p, loss, grad| {
        take_step(obj, w, p, loss, grad, &rule)
    })
}

fn descend<F, O, S>(
    obj: &O,
    x0: &[F],
    convergence: &ConvergenceParams<F>,
    step: S,
) -> Result<GradientDescentResult<F>, OptimError>
where
    F: Float,
    O: Objective<F>,
    S: Fn(&[F], &[F], F, &[F]) -> StepOutcome<F>,
{
    validate_max_iter(convergence.max_iter)?;
    let mut w = starting_point(obj.dim(), Some(x0))?;
    let (mut loss, mut grad) = obj.eval_grad(&w);
    let mut run = Run::new(
        convergence.tolerances,
        AlgorithmOrder::FirstOrder,
        convergence.max_iter,
        &w,
        loss,
        norm(&grad),
    );

    for iter in 0..convergence.max_iter {
        let grad_norm = norm(&grad);
        let direction = neg(&grad);
        let outcome = step(&w, &direction, loss, &grad);
        let new_grad_norm = norm(&outcome.grad);

        let record = IterationRecord {
            iter,
            w: w.clone(),
            loss,
            grad: grad.clone(),
            grad_norm,
            direction,
            alpha: outcome.alpha,
            w_new: outcome.w_new.clone(),
            new_loss: outcome.loss,
            new_grad_norm,
            line_search: outcome.line_search,
            details: (),
        };
        if run.push(record) {
            break;
        }

        w = outcome.w_new;
        loss = outcome.loss;
        grad = outcome.grad;
    }

    Ok(run.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convergence::ConvergenceCriterion;
    use crate::line_search::LineSearchStatus;

    /// f(w) = w0^2 + w1^2
    struct Bowl;

    impl Objective<f64> for Bowl {
        fn dim(&self) -> usize {
            2
        }

        fn value(&self, w: &[f64]) -> f64 {
            w[0] * w[0] + w[1] * w[1]
        }

        fn gradient(&self, w: &[f64]) -> Vec<f64> {
            vec![2.0 * w[0], 2.0 * w[1]]
        }
    }

    #[test]
    fn fixed_step_contracts_geometrically() {
        let config = GradientDescentConfig {
            alpha: 0.1,
            convergence: ConvergenceParams {
                max_iter: 3,
                ..Default::default()
            },
        };
        let result = gradient_descent(&Bowl, &[-1.0, 1.0], &config).unwrap();

        assert_eq!(
            result.summary.convergence_criterion,
            ConvergenceCriterion::MaxIter
        );
        assert_eq!(result.summary.iteration_count, 3);
        // Each step multiplies w by 1 - 2 * alpha = 0.8.
        let first = &result.iterations[0];
        assert!((first.w_new[0] + 0.8).abs() < 1e-15);
        assert!((first.w_new[1] - 0.8).abs() < 1e-15);
        assert_eq!(first.alpha, 0.1);
        assert!(first.line_search.is_none());
        // Iterates chain.
        assert_eq!(result.iterations[1].w, first.w_new);
    }

    #[test]
    fn fixed_step_ignores_loss_and_step_tolerances() {
        let config = GradientDescentConfig {
            alpha: 0.1,
            convergence: ConvergenceParams {
                max_iter: 100,
                tolerances: crate::convergence::Tolerances {
                    gtol: 1e-6,
                    ftol: 1.0,
                    xtol: 1.0,
                },
            },
        };
        let result = gradient_descent(&Bowl, &[-1.0, 1.0], &config).unwrap();

        assert_eq!(
            result.summary.convergence_criterion,
            ConvergenceCriterion::Gradient
        );
        assert!(!result.summary.stalled);
        assert!(result.summary.final_grad_norm < 1e-6);
        // 2 * sqrt(2) * 0.8^k < 1e-6 first holds at k = 67.
        assert_eq!(result.summary.iteration_count, 67);
    }

    #[test]
    fn non_positive_alpha_is_rejected() {
        let config = GradientDescentConfig {
            alpha: 0.0,
            ..Default::default()
        };
        let err = gradient_descent(&Bowl, &[1.0, 1.0], &config).unwrap_err();
        assert!(matches!(err, OptimError::InvalidParameter { name: "alpha", .. }));
    }

    #[test]
    fn zero_max_iter_is_rejected() {
        let config = LineSearchGdConfig {
            convergence: ConvergenceParams {
                max_iter: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            gradient_descent_line_search(&Bowl, &[1.0, 1.0], &config).unwrap_err(),
            OptimError::ZeroMaxIter
        );
    }

    #[test]
    fn line_search_solves_isotropic_bowl_quickly() {
        let result =
            gradient_descent_line_search(&Bowl, &[-1.0, 1.0], &LineSearchGdConfig::default())
                .unwrap();

        // alpha = 1 overshoots to +w, alpha = 0.5 lands exactly on the minimum.
        let first = &result.iterations[0];
        assert_eq!(first.alpha, 0.5);
        assert_eq!(
            first.line_search_status(),
            Some(LineSearchStatus::Satisfied)
        );
        assert_eq!(result.summary.iteration_count, 1);
        assert!(result.summary.converged);
        assert_eq!(
            result.summary.convergence_criterion,
            ConvergenceCriterion::Gradient
        );
    }
}
