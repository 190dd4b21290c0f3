//! The five drivers and the bookkeeping they share.
//!
//! Every driver runs the same loop: evaluate at `w`, compute a direction,
//! step (fixed, full or line search), then hand the finished
//! [`IterationRecord`] to [`Run::push`], which applies the termination checks.

pub mod diagonal;
pub mod gradient_descent;
pub mod lbfgs;
pub mod newton;

use optiviz::vector::axpy;
use optiviz::Float;

use crate::convergence::{
    check_termination, termination_message, AlgorithmOrder, ConvergenceCriterion, StepMeasures,
    Tolerances,
};
use crate::error::OptimError;
use crate::line_search::{
    backtracking_armijo, ArmijoParams, LineSearchStatus, LineSearchTrace, StepRule,
};
use crate::objective::Objective;
use crate::result::{AlgorithmResult, AlgorithmSummary, IterationDetails, IterationRecord};

/// Coordinate value of the default starting point `[0.1, ..., 0.1]`.
pub const DEFAULT_START: f64 = 0.1;

/// Resolve the starting point, checking it against the problem dimension.
pub(crate) fn starting_point<F: Float>(
    dim: usize,
    initial: Option<&[F]>,
) -> Result<Vec<F>, OptimError> {
    match initial {
        Some(w0) if w0.len() != dim => Err(OptimError::DimensionMismatch {
            expected: dim,
            actual: w0.len(),
        }),
        Some(w0) => Ok(w0.to_vec()),
        None => Ok(vec![F::lit(DEFAULT_START); dim]),
    }
}

pub(crate) fn validate_max_iter(max_iter: usize) -> Result<(), OptimError> {
    if max_iter == 0 {
        return Err(OptimError::ZeroMaxIter);
    }
    Ok(())
}

pub(crate) fn validate_damping<F: Float>(damping: F) -> Result<(), OptimError> {
    if damping.is_nan() || damping < F::zero() {
        return Err(OptimError::InvalidParameter {
            name: "hessian_damping",
            reason: "must be non-negative",
        });
    }
    Ok(())
}

pub(crate) fn validate_armijo<F: Float>(params: &ArmijoParams<F>) -> Result<(), OptimError> {
    let in_unit_interval = |v: F| v > F::zero() && v < F::one();
    if !in_unit_interval(params.c1) {
        return Err(OptimError::InvalidParameter {
            name: "c1",
            reason: "must lie in (0, 1)",
        });
    }
    if !in_unit_interval(params.rho) {
        return Err(OptimError::InvalidParameter {
            name: "rho",
            reason: "must lie in (0, 1)",
        });
    }
    Ok(())
}

pub(crate) fn validate_step_rule<F: Float>(rule: &StepRule<F>) -> Result<(), OptimError> {
    match rule {
        StepRule::Armijo(params) => validate_armijo(params),
        StepRule::FullStep => Ok(()),
    }
}

/// The point reached by one step, with its loss and gradient.
pub(crate) struct StepOutcome<F> {
    pub alpha: F,
    pub w_new: Vec<F>,
    pub loss: F,
    pub grad: Vec<F>,
    pub line_search: Option<LineSearchTrace<F>>,
}

/// Step `alpha` along `p` without any acceptance test.
pub(crate) fn fixed_step<F: Float, O: Objective<F>>(
    obj: &O,
    w: &[F],
    p: &[F],
    alpha: F,
) -> StepOutcome<F> {
    let w_new = axpy(alpha, p, w);
    let (loss, grad) = obj.eval_grad(&w_new);
    StepOutcome {
        alpha,
        w_new,
        loss,
        grad,
        line_search: None,
    }
}

/// Step along `p` according to `rule`.
pub(crate) fn take_step<F: Float, O: Objective<F>>(
    obj: &O,
    w: &[F],
    p: &[F],
    loss: F,
    grad: &[F],
    rule: &StepRule<F>,
) -> StepOutcome<F> {
    match rule {
        StepRule::Armijo(params) => {
            let ls = backtracking_armijo(obj, w, p, loss, grad, params);
            StepOutcome {
                alpha: ls.alpha,
                w_new: ls.w_new,
                loss: ls.value,
                grad: ls.gradient,
                line_search: Some(ls.trace),
            }
        }
        StepRule::FullStep => fixed_step(obj, w, p, F::one()),
    }
}

/// Iteration log and termination state of one run.
pub(crate) struct Run<F, D> {
    tolerances: Tolerances<F>,
    order: AlgorithmOrder,
    start: Vec<F>,
    start_loss: F,
    start_grad_norm: F,
    iterations: Vec<IterationRecord<F, D>>,
    measures: Option<StepMeasures<F>>,
    criterion: Option<ConvergenceCriterion>,
    final_eigenvalues: Option<Vec<F>>,
}

impl<F: Float, D: IterationDetails<F>> Run<F, D> {
    pub fn new(
        tolerances: Tolerances<F>,
        order: AlgorithmOrder,
        max_iter: usize,
        start: &[F],
        start_loss: F,
        start_grad_norm: F,
    ) -> Self {
        Run {
            tolerances,
            order,
            start: start.to_vec(),
            start_loss,
            start_grad_norm,
            iterations: Vec::with_capacity(max_iter.min(1024)),
            measures: None,
            criterion: None,
            final_eigenvalues: None,
        }
    }

    /// Criterion that stopped the run so far, if any.
    pub fn criterion(&self) -> Option<ConvergenceCriterion> {
        self.criterion
    }

    /// Hessian eigenvalues at the final iterate.
    ///
    /// Saddle detection uses these instead of the eigenvalues recorded at the
    /// start of the last step.
    pub fn set_final_eigenvalues(&mut self, eigenvalues: Vec<F>) {
        self.final_eigenvalues = Some(eigenvalues);
    }

    /// Record a finished step. Returns `true` when the run must stop.
    pub fn push(&mut self, record: IterationRecord<F, D>) -> bool {
        let m = StepMeasures::new(
            record.loss,
            record.new_loss,
            record.new_grad_norm,
            &record.w,
            &record.w_new,
        );
        self.criterion = check_termination(&m, &self.tolerances);
        self.measures = Some(m);
        self.iterations.push(record);
        self.criterion.is_some()
    }

    pub fn finish(self) -> AlgorithmResult<F, D> {
        let criterion = self.criterion.unwrap_or(ConvergenceCriterion::MaxIter);
        let iteration_count = self.iterations.len();
        let measures = self.measures.unwrap_or(StepMeasures {
            loss: self.start_loss,
            grad_norm: self.start_grad_norm,
            function_change: F::zero(),
            step_size: F::zero(),
        });

        let last = self.iterations.last();
        let eigenvalues = match &self.final_eigenvalues {
            Some(e) => Some(e.as_slice()),
            None => last.and_then(|r| r.details.hessian_eigenvalues()),
        };
        let saddle_point = criterion == ConvergenceCriterion::Gradient
            && eigenvalues.map_or(false, |e| e.iter().any(|&v| v < F::zero()));
        let termination_message = termination_message(
            criterion,
            &measures,
            &self.tolerances,
            eigenvalues,
            self.order,
            iteration_count,
        );

        let gradient_fallbacks = self
            .iterations
            .iter()
            .filter(|r| r.details.used_gradient_fallback())
            .count();
        let line_search_exhaustions = self
            .iterations
            .iter()
            .filter(|r| r.line_search_status() == Some(LineSearchStatus::Exhausted))
            .count();

        let (final_location, final_step_size, final_function_change) = match last {
            Some(r) => (
                r.w_new.clone(),
                Some(measures.step_size),
                Some(measures.function_change),
            ),
            None => (self.start.clone(), None, None),
        };

        let summary = AlgorithmSummary {
            converged: criterion.is_convergence(),
            diverged: criterion == ConvergenceCriterion::Diverged,
            stalled: criterion.is_stall(),
            saddle_point,
            final_location,
            final_loss: measures.loss,
            final_grad_norm: measures.grad_norm,
            final_step_size,
            final_function_change,
            iteration_count,
            convergence_criterion: criterion,
            termination_message,
            gradient_fallbacks,
            line_search_exhaustions,
        };

        AlgorithmResult {
            iterations: self.iterations,
            summary,
        }
    }
}
