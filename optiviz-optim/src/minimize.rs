//! Option-driven entry point over all five drivers.
//!
//! [`minimize`] takes a runtime-assembled [`ProblemFunctions`] and a flat
//! [`AlgorithmOptions`], resolves the problem's Hessian capability before any
//! iteration, converts the options into the driver's typed config and runs it.
//! This is the only place in the crate that emits `tracing` events.

use std::fmt;
use std::str::FromStr;

use optiviz::Float;
use tracing::{debug, warn};

use crate::convergence::{ConvergenceParams, Tolerances};
use crate::error::OptimError;
use crate::line_search::{ArmijoParams, StepRule};
use crate::objective::ProblemFunctions;
use crate::result::AlgorithmSummary;
use crate::solvers::diagonal::{
    diagonal_preconditioner, DiagonalPreconditionerConfig, DiagonalPreconditionerResult,
};
use crate::solvers::gradient_descent::{
    gradient_descent, gradient_descent_line_search, GradientDescentConfig, GradientDescentResult,
    LineSearchGdConfig,
};
use crate::solvers::lbfgs::{lbfgs, LbfgsConfig, LbfgsResult};
use crate::solvers::newton::{newton, NewtonConfig, NewtonResult};
use crate::solvers::starting_point;

const DEFAULT_MAX_ITER: usize = 100;
const DEFAULT_GTOL: f64 = 1e-6;
const DEFAULT_FTOL: f64 = 2.220446049250313e-9;
const DEFAULT_XTOL: f64 = 1e-9;
const DEFAULT_ALPHA: f64 = 0.1;
const DEFAULT_C1: f64 = 1e-4;
const DEFAULT_MEMORY: usize = 5;
const DEFAULT_DAMPING: f64 = 0.01;

/// The five drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Algorithm {
    GdFixed,
    GdLinesearch,
    Newton,
    Lbfgs,
    DiagonalPreconditioner,
}

impl Algorithm {
    pub const ALL: [Algorithm; 5] = [
        Algorithm::GdFixed,
        Algorithm::GdLinesearch,
        Algorithm::Newton,
        Algorithm::Lbfgs,
        Algorithm::DiagonalPreconditioner,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::GdFixed => "gd-fixed",
            Algorithm::GdLinesearch => "gd-linesearch",
            Algorithm::Newton => "newton",
            Algorithm::Lbfgs => "lbfgs",
            Algorithm::DiagonalPreconditioner => "diagonal-preconditioner",
        }
    }

    /// Whether the driver evaluates the Hessian.
    pub fn requires_hessian(self) -> bool {
        matches!(self, Algorithm::Newton | Algorithm::DiagonalPreconditioner)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = OptimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| OptimError::UnknownAlgorithm(s.to_string()))
    }
}

/// Step strategy selected through [`AlgorithmOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LineSearchKind {
    #[default]
    Armijo,
    /// Full unit step. Only Newton and the diagonal preconditioner honor it.
    None,
}

/// Flat option set shared by every driver.
///
/// Fields a driver does not use are ignored. Missing thresholds fall back to
/// `gtol = 1e-6`, `ftol = 2.220446049250313e-9`, `xtol = 1e-9`, except for
/// Newton, which requires all three.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(deserialize = "F: Float + serde::Deserialize<'de>"))
)]
pub struct AlgorithmOptions<F> {
    #[cfg_attr(feature = "serde", serde(default = "default_max_iter"))]
    pub max_iter: usize,
    /// Defaults to `[0.1; d]`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub initial_point: Option<Vec<F>>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub gtol: Option<F>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub ftol: Option<F>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub xtol: Option<F>,
    /// Fixed step size for `gd-fixed`.
    #[cfg_attr(feature = "serde", serde(default = "default_alpha"))]
    pub alpha: F,
    #[cfg_attr(feature = "serde", serde(default = "default_c1"))]
    pub c1: F,
    /// L-BFGS memory size.
    #[cfg_attr(feature = "serde", serde(default = "default_memory"))]
    pub m: usize,
    #[cfg_attr(feature = "serde", serde(default = "default_damping"))]
    pub hessian_damping: F,
    #[cfg_attr(feature = "serde", serde(default))]
    pub line_search: LineSearchKind,
    /// Line-search curve samples to record per iteration.
    #[cfg_attr(feature = "serde", serde(default))]
    pub curve_samples: Option<usize>,
    /// Rebuild the L-BFGS approximate Hessian each iteration.
    #[cfg_attr(feature = "serde", serde(default))]
    pub reconstruct_hessian: bool,
}

#[cfg(feature = "serde")]
fn default_max_iter() -> usize {
    DEFAULT_MAX_ITER
}

#[cfg(feature = "serde")]
fn default_memory() -> usize {
    DEFAULT_MEMORY
}

#[cfg(feature = "serde")]
fn default_alpha<F: Float>() -> F {
    F::lit(DEFAULT_ALPHA)
}

#[cfg(feature = "serde")]
fn default_c1<F: Float>() -> F {
    F::lit(DEFAULT_C1)
}

#[cfg(feature = "serde")]
fn default_damping<F: Float>() -> F {
    F::lit(DEFAULT_DAMPING)
}

impl<F: Float> AlgorithmOptions<F> {
    /// Options with every field at its default and no thresholds set.
    pub fn new() -> Self {
        AlgorithmOptions {
            max_iter: DEFAULT_MAX_ITER,
            initial_point: None,
            gtol: None,
            ftol: None,
            xtol: None,
            alpha: F::lit(DEFAULT_ALPHA),
            c1: F::lit(DEFAULT_C1),
            m: DEFAULT_MEMORY,
            hessian_damping: F::lit(DEFAULT_DAMPING),
            line_search: LineSearchKind::Armijo,
            curve_samples: None,
            reconstruct_hessian: false,
        }
    }

    /// Set all three thresholds.
    pub fn with_tolerances(mut self, gtol: F, ftol: F, xtol: F) -> Self {
        self.gtol = Some(gtol);
        self.ftol = Some(ftol);
        self.xtol = Some(xtol);
        self
    }

    fn tolerances_or_default(&self) -> Tolerances<F> {
        Tolerances {
            gtol: self.gtol.unwrap_or_else(|| F::lit(DEFAULT_GTOL)),
            ftol: self.ftol.unwrap_or_else(|| F::lit(DEFAULT_FTOL)),
            xtol: self.xtol.unwrap_or_else(|| F::lit(DEFAULT_XTOL)),
        }
    }

    fn explicit_tolerances(&self) -> Option<Tolerances<F>> {
        Some(Tolerances {
            gtol: self.gtol?,
            ftol: self.ftol?,
            xtol: self.xtol?,
        })
    }

    fn convergence(&self) -> ConvergenceParams<F> {
        ConvergenceParams {
            max_iter: self.max_iter,
            tolerances: self.tolerances_or_default(),
        }
    }

    fn armijo(&self) -> ArmijoParams<F> {
        ArmijoParams {
            c1: self.c1,
            rho: F::lit(0.5),
            max_trials: 20,
            curve_samples: self.curve_samples,
        }
    }

    fn step_rule(&self) -> StepRule<F> {
        match self.line_search {
            LineSearchKind::Armijo => StepRule::Armijo(self.armijo()),
            LineSearchKind::None => StepRule::FullStep,
        }
    }

    pub fn gradient_descent_config(&self) -> GradientDescentConfig<F> {
        GradientDescentConfig {
            alpha: self.alpha,
            convergence: self.convergence(),
        }
    }

    pub fn line_search_gd_config(&self) -> LineSearchGdConfig<F> {
        LineSearchGdConfig {
            convergence: self.convergence(),
            line_search: self.armijo(),
        }
    }

    /// Newton config; `tolerances` is `None` unless all three thresholds are set.
    pub fn newton_config(&self) -> NewtonConfig<F> {
        NewtonConfig {
            max_iter: self.max_iter,
            tolerances: self.explicit_tolerances(),
            hessian_damping: self.hessian_damping,
            step: self.step_rule(),
        }
    }

    pub fn lbfgs_config(&self) -> LbfgsConfig<F> {
        LbfgsConfig {
            memory: self.m,
            convergence: self.convergence(),
            line_search: self.armijo(),
            hessian_damping: self.hessian_damping,
            reconstruct_hessian: self.reconstruct_hessian,
        }
    }

    pub fn diagonal_preconditioner_config(&self) -> DiagonalPreconditionerConfig<F> {
        DiagonalPreconditionerConfig {
            convergence: self.convergence(),
            hessian_damping: self.hessian_damping,
            step: self.step_rule(),
        }
    }
}

impl<F: Float> Default for AlgorithmOptions<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of [`minimize`], tagged by driver.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(
        tag = "algorithm",
        content = "result",
        rename_all = "kebab-case",
        bound = "F: optiviz::serde_float::FloatWire"
    )
)]
pub enum AlgorithmRun<F> {
    GdFixed(GradientDescentResult<F>),
    GdLinesearch(GradientDescentResult<F>),
    Newton(NewtonResult<F>),
    Lbfgs(LbfgsResult<F>),
    DiagonalPreconditioner(DiagonalPreconditionerResult<F>),
}

impl<F> AlgorithmRun<F> {
    pub fn algorithm(&self) -> Algorithm {
        match self {
            AlgorithmRun::GdFixed(_) => Algorithm::GdFixed,
            AlgorithmRun::GdLinesearch(_) => Algorithm::GdLinesearch,
            AlgorithmRun::Newton(_) => Algorithm::Newton,
            AlgorithmRun::Lbfgs(_) => Algorithm::Lbfgs,
            AlgorithmRun::DiagonalPreconditioner(_) => Algorithm::DiagonalPreconditioner,
        }
    }

    pub fn summary(&self) -> &AlgorithmSummary<F> {
        match self {
            AlgorithmRun::GdFixed(r) | AlgorithmRun::GdLinesearch(r) => &r.summary,
            AlgorithmRun::Newton(r) => &r.summary,
            AlgorithmRun::Lbfgs(r) => &r.summary,
            AlgorithmRun::DiagonalPreconditioner(r) => &r.summary,
        }
    }

    /// Iterates `w_new` of every record, preceded by the starting point.
    pub fn trajectory(&self) -> Vec<Vec<F>>
    where
        F: Clone,
    {
        fn collect<F: Clone, D>(r: &crate::result::AlgorithmResult<F, D>) -> Vec<Vec<F>> {
            let mut path = Vec::with_capacity(r.iterations.len() + 1);
            if let Some(first) = r.iterations.first() {
                path.push(first.w.clone());
            }
            path.extend(r.iterations.iter().map(|it| it.w_new.clone()));
            path
        }
        match self {
            AlgorithmRun::GdFixed(r) | AlgorithmRun::GdLinesearch(r) => collect(r),
            AlgorithmRun::Newton(r) => collect(r),
            AlgorithmRun::Lbfgs(r) => collect(r),
            AlgorithmRun::DiagonalPreconditioner(r) => collect(r),
        }
    }
}

/// Run `algorithm` on `problem` with `options`.
///
/// Configuration errors (missing Hessian, missing Newton thresholds, bad
/// parameters, wrong starting-point dimension) are returned before the first
/// iteration. Divergence, singular Hessians and exhausted line searches are
/// reported in the returned summary.
pub fn minimize<F: Float>(
    algorithm: Algorithm,
    problem: &ProblemFunctions<F>,
    options: &AlgorithmOptions<F>,
) -> Result<AlgorithmRun<F>, OptimError> {
    let hessian_view = if algorithm.requires_hessian() {
        Some(problem.require_hessian(algorithm.name())?)
    } else {
        None
    };
    let x0 = starting_point(problem.dimensionality(), options.initial_point.as_deref())?;

    debug!(
        algorithm = %algorithm,
        dim = problem.dimensionality(),
        max_iter = options.max_iter,
        "starting run"
    );

    let run = match (algorithm, hessian_view) {
        (Algorithm::GdFixed, _) => AlgorithmRun::GdFixed(gradient_descent(
            problem,
            &x0,
            &options.gradient_descent_config(),
        )?),
        (Algorithm::GdLinesearch, _) => AlgorithmRun::GdLinesearch(gradient_descent_line_search(
            problem,
            &x0,
            &options.line_search_gd_config(),
        )?),
        (Algorithm::Lbfgs, _) => {
            AlgorithmRun::Lbfgs(lbfgs(problem, &x0, &options.lbfgs_config())?)
        }
        (Algorithm::Newton, Some(view)) => {
            AlgorithmRun::Newton(newton(&view, &x0, &options.newton_config())?)
        }
        (Algorithm::DiagonalPreconditioner, Some(view)) => AlgorithmRun::DiagonalPreconditioner(
            diagonal_preconditioner(&view, &x0, &options.diagonal_preconditioner_config())?,
        ),
        (Algorithm::Newton | Algorithm::DiagonalPreconditioner, None) => {
            return Err(OptimError::MissingHessian {
                algorithm: algorithm.name(),
            })
        }
    };

    let summary = run.summary();
    debug!(
        algorithm = %algorithm,
        criterion = %summary.convergence_criterion,
        iterations = summary.iteration_count,
        final_loss = summary.final_loss.to_f64().unwrap_or(f64::NAN),
        "run finished"
    );
    if summary.gradient_fallbacks > 0 {
        warn!(
            algorithm = %algorithm,
            count = summary.gradient_fallbacks,
            "singular damped Hessian, fell back to steepest descent"
        );
    }
    if summary.line_search_exhaustions > 0 {
        warn!(
            algorithm = %algorithm,
            count = summary.line_search_exhaustions,
            "line search exhausted, accepted smallest trial step"
        );
    }
    if summary.diverged {
        warn!(algorithm = %algorithm, "{}", summary.termination_message);
    }

    Ok(run)
}
