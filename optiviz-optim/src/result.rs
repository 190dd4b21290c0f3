use crate::convergence::ConvergenceCriterion;
use crate::line_search::{LineSearchStatus, LineSearchTrace};

/// Where a search direction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DirectionSource {
    /// Solved against the (damped) Hessian.
    Newton,
    /// The damped Hessian was singular; steepest descent was used instead.
    GradientFallback,
}

/// Per-iteration payload specific to a driver.
///
/// The run bookkeeping reads Hessian eigenvalues (for saddle detection in the
/// termination message) and fallback tags through this trait.
pub trait IterationDetails<F> {
    /// Eigenvalues of the true Hessian at this iterate, if computed.
    fn hessian_eigenvalues(&self) -> Option<&[F]> {
        None
    }

    /// True when the direction had to fall back to steepest descent.
    fn used_gradient_fallback(&self) -> bool {
        false
    }
}

impl<F> IterationDetails<F> for () {}

/// One step of a driver.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(
        serialize = "F: optiviz::serde_float::FloatWire, D: serde::Serialize",
        deserialize = "F: optiviz::serde_float::FloatWire, D: serde::Deserialize<'de>"
    ))
)]
pub struct IterationRecord<F, D> {
    /// Zero-based iteration index.
    pub iter: usize,
    /// Iterate at the start of the step.
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub w: Vec<F>,
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub loss: F,
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub grad: Vec<F>,
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub grad_norm: F,
    /// Search direction `p`.
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub direction: Vec<F>,
    /// Step size applied to `direction`.
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub alpha: F,
    /// `w + alpha * direction`.
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub w_new: Vec<F>,
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub new_loss: F,
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub new_grad_norm: F,
    /// Present when a line search chose `alpha`.
    pub line_search: Option<LineSearchTrace<F>>,
    /// Driver-specific diagnostics.
    pub details: D,
}

impl<F, D> IterationRecord<F, D> {
    /// Line-search outcome of this step, if a line search ran.
    pub fn line_search_status(&self) -> Option<LineSearchStatus> {
        self.line_search.as_ref().map(|t| t.status)
    }
}

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(bound = "F: optiviz::serde_float::FloatWire"))]
pub struct AlgorithmSummary<F> {
    /// One of the gradient, ftol or xtol criteria fired.
    pub converged: bool,
    /// A non-finite loss or gradient norm was produced.
    pub diverged: bool,
    /// Converged via ftol or xtol rather than a small gradient.
    pub stalled: bool,
    /// The gradient criterion fired where the Hessian has a negative eigenvalue.
    pub saddle_point: bool,
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub final_location: Vec<F>,
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub final_loss: F,
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub final_grad_norm: F,
    /// Relative step size of the last iteration.
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub final_step_size: Option<F>,
    /// Relative function change of the last iteration.
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub final_function_change: Option<F>,
    pub iteration_count: usize,
    pub convergence_criterion: ConvergenceCriterion,
    pub termination_message: String,
    /// Iterations whose direction fell back to steepest descent.
    pub gradient_fallbacks: usize,
    /// Iterations whose line search accepted a step without sufficient decrease.
    pub line_search_exhaustions: usize,
}

/// Full iteration trace plus summary of a run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(
        serialize = "F: optiviz::serde_float::FloatWire, D: serde::Serialize",
        deserialize = "F: optiviz::serde_float::FloatWire, D: serde::Deserialize<'de>"
    ))
)]
pub struct AlgorithmResult<F, D> {
    pub iterations: Vec<IterationRecord<F, D>>,
    pub summary: AlgorithmSummary<F>,
}

impl<F, D> AlgorithmResult<F, D> {
    pub fn last_iteration(&self) -> Option<&IterationRecord<F, D>> {
        self.iterations.last()
    }

    pub fn all_iterations(&self) -> &[IterationRecord<F, D>] {
        &self.iterations
    }
}
