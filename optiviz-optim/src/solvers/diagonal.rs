use optiviz::linalg::diagonal;
use optiviz::vector::norm;
use optiviz::Float;

use crate::convergence::{AlgorithmOrder, ConvergenceParams};
use crate::error::OptimError;
use crate::line_search::{ArmijoParams, StepRule};
use crate::objective::HessianObjective;
use crate::result::{AlgorithmResult, IterationDetails, IterationRecord};
use crate::solvers::{
    starting_point, take_step, validate_damping, validate_max_iter, validate_step_rule, Run,
};

/// Configuration for the diagonal preconditioner.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiagonalPreconditionerConfig<F> {
    pub convergence: ConvergenceParams<F>,
    /// `lambda` in `1 / (H_ii + lambda)` (default: 0.01).
    pub hessian_damping: F,
    pub step: StepRule<F>,
}

impl Default for DiagonalPreconditionerConfig<f64> {
    fn default() -> Self {
        DiagonalPreconditionerConfig {
            convergence: ConvergenceParams::default(),
            hessian_damping: 0.01,
            step: StepRule::Armijo(ArmijoParams::default()),
        }
    }
}

impl Default for DiagonalPreconditionerConfig<f32> {
    fn default() -> Self {
        DiagonalPreconditionerConfig {
            convergence: ConvergenceParams::default(),
            hessian_damping: 0.01,
            step: StepRule::Armijo(ArmijoParams::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(bound = "F: optiviz::serde_float::FloatWire"))]
pub struct PreconditionerDetails<F> {
    /// `H_ii` at `w`.
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub hessian_diagonal: Vec<F>,
    /// `D_ii = 1 / (H_ii + lambda)`.
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub preconditioner: Vec<F>,
}

impl<F> IterationDetails<F> for PreconditionerDetails<F> {}

pub type DiagonalPreconditionerResult<F> = AlgorithmResult<F, PreconditionerDetails<F>>;

/// Gradient descent scaled by the inverse Hessian diagonal.
///
/// Direction `p_i = -g_i / (H_ii + lambda)`. Identical to Newton whenever the
/// Hessian is diagonal; off-diagonal coupling is ignored entirely, so strongly
/// coupled problems zig-zag the way plain gradient descent does.
pub fn diagonal_preconditioner<F: Float, O: HessianObjective<F>>(
    obj: &O,
    x0: &[F],
    config: &DiagonalPreconditionerConfig<F>,
) -> Result<DiagonalPreconditionerResult<F>, OptimError> {
    validate_max_iter(config.convergence.max_iter)?;
    validate_damping(config.hessian_damping)?;
    validate_step_rule(&config.step)?;

    let mut w = starting_point(obj.dim(), Some(x0))?;
    let (mut loss, mut grad) = obj.eval_grad(&w);
    let mut run = Run::new(
        config.convergence.tolerances,
        AlgorithmOrder::FirstOrder,
        config.convergence.max_iter,
        &w,
        loss,
        norm(&grad),
    );

    for iter in 0..config.convergence.max_iter {
        let grad_norm = norm(&grad);
        let hessian_diagonal = diagonal(&obj.hessian(&w));
        let preconditioner: Vec<F> = hessian_diagonal
            .iter()
            .map(|&h| F::one() / (h + config.hessian_damping))
            .collect();
        let direction: Vec<F> = preconditioner
            .iter()
            .zip(&grad)
            .map(|(&d, &g)| -(d * g))
            .collect();

        let outcome = take_step(obj, &w, &direction, loss, &grad, &config.step);
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
            details: PreconditionerDetails {
                hessian_diagonal,
                preconditioner,
            },
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
