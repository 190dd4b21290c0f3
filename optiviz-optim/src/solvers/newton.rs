use optiviz::eigen::{condition_number, symmetric_eigenvalues};
use optiviz::linalg::{invert_matrix, mat_vec, shift_diagonal};
use optiviz::vector::{neg, norm};
use optiviz::Float;

use crate::convergence::{AlgorithmOrder, ConvergenceCriterion, Tolerances};
use crate::error::OptimError;
use crate::line_search::{ArmijoParams, StepRule};
use crate::objective::HessianObjective;
use crate::result::{AlgorithmResult, DirectionSource, IterationDetails, IterationRecord};
use crate::solvers::{
    starting_point, take_step, validate_damping, validate_max_iter, validate_step_rule, Run,
};

/// Configuration for the Newton solver.
///
/// `tolerances` has no default: Newton runs must state their termination
/// thresholds explicitly, and [`newton`] fails with
/// [`OptimError::MissingTolerances`] when they are absent.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewtonConfig<F> {
    /// Maximum number of iterations (default: 100).
    pub max_iter: usize,
    /// Termination thresholds (required).
    pub tolerances: Option<Tolerances<F>>,
    /// `lambda` in `H + lambda * I` (default: 0.01).
    pub hessian_damping: F,
    /// Armijo line search (default) or full unit step.
    pub step: StepRule<F>,
}

impl Default for NewtonConfig<f64> {
    fn default() -> Self {
        NewtonConfig {
            max_iter: 100,
            tolerances: None,
            hessian_damping: 0.01,
            step: StepRule::Armijo(ArmijoParams::default()),
        }
    }
}

impl Default for NewtonConfig<f32> {
    fn default() -> Self {
        NewtonConfig {
            max_iter: 100,
            tolerances: None,
            hessian_damping: 0.01,
            step: StepRule::Armijo(ArmijoParams::default()),
        }
    }
}

/// Hessian diagnostics for one Newton iteration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(bound = "F: optiviz::serde_float::FloatWire"))]
pub struct NewtonDetails<F> {
    /// True Hessian at `w`.
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub hessian: Vec<Vec<F>>,
    /// `H + lambda * I`.
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub damped_hessian: Vec<Vec<F>>,
    /// Inverse of the damped Hessian; `None` when it was singular.
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub hessian_inverse: Option<Vec<Vec<F>>>,
    /// Eigenvalues of the true Hessian, by descending magnitude.
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub eigenvalues: Vec<F>,
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub condition_number: F,
    pub direction_source: DirectionSource,
}

impl<F> IterationDetails<F> for NewtonDetails<F> {
    fn hessian_eigenvalues(&self) -> Option<&[F]> {
        Some(&self.eigenvalues)
    }

    fn used_gradient_fallback(&self) -> bool {
        self.direction_source == DirectionSource::GradientFallback
    }
}

pub type NewtonResult<F> = AlgorithmResult<F, NewtonDetails<F>>;

/// Damped Newton's method.
///
/// Each iteration solves against `H + lambda * I` through an explicit inverse
/// and steps along `p = -(H + lambda I)^-1 ∇f`, either with the Armijo line
/// search or a full unit step. If the damped Hessian is singular the
/// direction falls back to `-∇f`; such iterations are tagged
/// [`DirectionSource::GradientFallback`] and counted in the summary.
pub fn newton<F: Float, O: HessianObjective<F>>(
    obj: &O,
    x0: &[F],
    config: &NewtonConfig<F>,
) -> Result<NewtonResult<F>, OptimError> {
    let tolerances = config
        .tolerances
        .ok_or(OptimError::MissingTolerances { algorithm: "newton" })?;
    validate_max_iter(config.max_iter)?;
    validate_damping(config.hessian_damping)?;
    validate_step_rule(&config.step)?;

    let mut w = starting_point(obj.dim(), Some(x0))?;
    let (mut loss, mut grad) = obj.eval_grad(&w);
    let mut run = Run::new(
        tolerances,
        AlgorithmOrder::SecondOrder,
        config.max_iter,
        &w,
        loss,
        norm(&grad),
    );

    for iter in 0..config.max_iter {
        let grad_norm = norm(&grad);
        let hessian = obj.hessian(&w);
        let eigenvalues = symmetric_eigenvalues(&hessian);
        let cond = condition_number(&eigenvalues);

        let damped_hessian = shift_diagonal(&hessian, config.hessian_damping);
        let hessian_inverse = invert_matrix(&damped_hessian);
        let (direction, direction_source) = match &hessian_inverse {
            Some(inv) => (neg(&mat_vec(inv, &grad)), DirectionSource::Newton),
            None => (neg(&grad), DirectionSource::GradientFallback),
        };

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
            details: NewtonDetails {
                hessian,
                damped_hessian,
                hessian_inverse,
                eigenvalues,
                condition_number: cond,
                direction_source,
            },
        };
        if run.push(record) {
            if run.criterion() == Some(ConvergenceCriterion::Gradient) {
                run.set_final_eigenvalues(symmetric_eigenvalues(&obj.hessian(&outcome.w_new)));
            }
            break;
        }

        w = outcome.w_new;
        loss = outcome.loss;
        grad = outcome.grad;
    }

    Ok(run.finish())
}
