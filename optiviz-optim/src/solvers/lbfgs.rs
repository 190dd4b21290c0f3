use std::collections::VecDeque;

use optiviz::eigen::symmetric_eigenvalues;
use optiviz::linalg::{identity, invert_matrix};
use optiviz::vector::{axpy, dot, neg, norm, scale, sub};
use optiviz::Float;

use crate::convergence::{AlgorithmOrder, ConvergenceParams};
use crate::error::OptimError;
use crate::line_search::{ArmijoParams, StepRule};
use crate::objective::Objective;
use crate::result::{AlgorithmResult, IterationDetails, IterationRecord};
use crate::solvers::{
    starting_point, take_step, validate_armijo, validate_damping, validate_max_iter, Run,
};

/// Minimum `s·y` for a curvature pair to enter memory.
pub const CURVATURE_THRESHOLD: f64 = 1e-10;

/// Configuration for the L-BFGS solver.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LbfgsConfig<F> {
    /// Number of recent (s, y) pairs to store (default: 5). Zero gives
    /// steepest descent with line search.
    pub memory: usize,
    /// Convergence parameters.
    pub convergence: ConvergenceParams<F>,
    /// Line search parameters.
    pub line_search: ArmijoParams<F>,
    /// Damping of the initial Hessian scaling, `gamma / (1 + lambda * gamma)`
    /// (default: 0.01).
    pub hessian_damping: F,
    /// Rebuild the explicit approximate Hessian each iteration (default: false).
    pub reconstruct_hessian: bool,
}

impl Default for LbfgsConfig<f64> {
    fn default() -> Self {
        LbfgsConfig {
            memory: 5,
            convergence: ConvergenceParams::default(),
            line_search: ArmijoParams::default(),
            hessian_damping: 0.01,
            reconstruct_hessian: false,
        }
    }
}

impl Default for LbfgsConfig<f32> {
    fn default() -> Self {
        LbfgsConfig {
            memory: 5,
            convergence: ConvergenceParams::default(),
            line_search: ArmijoParams::default(),
            hessian_damping: 0.01,
            reconstruct_hessian: false,
        }
    }
}

/// A curvature pair `s = w_new - w`, `y = ∇f(w_new) - ∇f(w)`, `rho = 1 / s·y`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(bound = "F: optiviz::serde_float::FloatWire"))]
pub struct MemoryPair<F> {
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub s: Vec<F>,
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub y: Vec<F>,
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub rho: F,
}

/// One pass of the two-loop recursion over a single memory pair.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(bound = "F: optiviz::serde_float::FloatWire"))]
pub struct TwoLoopStep<F> {
    /// Index of the pair in the memory snapshot, oldest first.
    pub pair: usize,
    /// `alpha_i` in the backward pass, `beta_i` in the forward pass.
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub coefficient: F,
    /// `q` (backward) or `r` (forward) after this pass.
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub vector: Vec<F>,
}

/// Intermediate values of the two-loop recursion.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(bound = "F: optiviz::serde_float::FloatWire"))]
pub struct TwoLoopTrace<F> {
    /// Newest pair first.
    pub first_loop: Vec<TwoLoopStep<F>>,
    /// `(s·y) / (y·y)` of the newest pair; `None` with empty memory.
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub gamma: Option<F>,
    /// Scaling actually applied to `q`.
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub damped_gamma: Option<F>,
    /// Oldest pair first.
    pub second_loop: Vec<TwoLoopStep<F>>,
}

/// L-BFGS diagnostics for one iteration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(bound = "F: optiviz::serde_float::FloatWire"))]
pub struct LbfgsDetails<F> {
    /// Memory used to compute this iteration's direction, oldest first.
    pub memory: Vec<MemoryPair<F>>,
    pub two_loop: TwoLoopTrace<F>,
    /// `s·y` of the pair produced by this step.
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub curvature: F,
    /// Whether that pair entered memory.
    pub pair_admitted: bool,
    /// Inverse of the implicit inverse-Hessian, when reconstruction is on.
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub approximate_hessian: Option<Vec<Vec<F>>>,
    #[cfg_attr(feature = "serde", serde(with = "optiviz::serde_float"))]
    pub approximate_eigenvalues: Option<Vec<F>>,
}

impl<F> IterationDetails<F> for LbfgsDetails<F> {}

pub type LbfgsResult<F> = AlgorithmResult<F, LbfgsDetails<F>>;

/// L-BFGS optimization.
///
/// Minimizes `obj` starting from `x0` using the limited-memory BFGS method
/// with two-loop recursion and backtracking Armijo line search. A new pair
/// enters memory only when `s·y > 1e-10`; the oldest pair is evicted once
/// `memory` pairs are held. Rejected pairs are dropped.
pub fn lbfgs<F: Float, O: Objective<F>>(
    obj: &O,
    x0: &[F],
    config: &LbfgsConfig<F>,
) -> Result<LbfgsResult<F>, OptimError> {
    validate_max_iter(config.convergence.max_iter)?;
    validate_armijo(&config.line_search)?;
    validate_damping(config.hessian_damping)?;

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

    let rule = StepRule::Armijo(config.line_search.clone());
    let threshold = F::lit(CURVATURE_THRESHOLD);
    let m = config.memory;
    let mut memory: VecDeque<MemoryPair<F>> = VecDeque::with_capacity(m);

    for iter in 0..config.convergence.max_iter {
        let grad_norm = norm(&grad);
        let (r, two_loop) = two_loop_recursion(&grad, &memory, config.hessian_damping);
        let direction = neg(&r);

        let (approx_hessian, approx_eigenvalues) = if config.reconstruct_hessian {
            match approximate_hessian(obj.dim(), &memory, config.hessian_damping) {
                Some(b) => {
                    let eigs = symmetric_eigenvalues(&b);
                    (Some(b), Some(eigs))
                }
                None => (None, None),
            }
        } else {
            (None, None)
        };
        let snapshot: Vec<MemoryPair<F>> = memory.iter().cloned().collect();

        let outcome = take_step(obj, &w, &direction, loss, &grad, &rule);
        let new_grad_norm = norm(&outcome.grad);

        let s = sub(&outcome.w_new, &w);
        let y = sub(&outcome.grad, &grad);
        let curvature = dot(&s, &y);
        let pair_admitted = m > 0 && curvature > threshold;
        if pair_admitted {
            if memory.len() == m {
                memory.pop_front();
            }
            memory.push_back(MemoryPair {
                s,
                y,
                rho: F::one() / curvature,
            });
        }

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
            details: LbfgsDetails {
                memory: snapshot,
                two_loop,
                curvature,
                pair_admitted,
                approximate_hessian: approx_hessian,
                approximate_eigenvalues: approx_eigenvalues,
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

/// Two-loop recursion: returns `r ≈ H_k^-1 · v` and its trace.
///
/// With empty memory `r = v`.
pub fn two_loop_recursion<'a, F, I>(
    v: &[F],
    memory: I,
    hessian_damping: F,
) -> (Vec<F>, TwoLoopTrace<F>)
where
    F: Float,
    I: IntoIterator<Item = &'a MemoryPair<F>>,
{
    let pairs: Vec<&MemoryPair<F>> = memory.into_iter().collect();
    let k = pairs.len();

    let mut q = v.to_vec();
    let mut alphas = vec![F::zero(); k];
    let mut first_loop = Vec::with_capacity(k);
    for i in (0..k).rev() {
        let pair = pairs[i];
        alphas[i] = pair.rho * dot(&pair.s, &q);
        q = axpy(-alphas[i], &pair.y, &q);
        first_loop.push(TwoLoopStep {
            pair: i,
            coefficient: alphas[i],
            vector: q.clone(),
        });
    }

    let (gamma, damped_gamma) = match pairs.last() {
        Some(newest) => {
            let yy = dot(&newest.y, &newest.y);
            if yy > F::zero() {
                let gamma = dot(&newest.s, &newest.y) / yy;
                let damped = if hessian_damping > F::zero() {
                    gamma / (F::one() + hessian_damping * gamma)
                } else {
                    gamma
                };
                (Some(gamma), Some(damped))
            } else {
                (None, None)
            }
        }
        None => (None, None),
    };

    let mut r = match damped_gamma {
        Some(g) => scale(&q, g),
        None => q,
    };

    let mut second_loop = Vec::with_capacity(k);
    for (i, pair) in pairs.iter().enumerate() {
        let beta = pair.rho * dot(&pair.y, &r);
        r = axpy(alphas[i] - beta, &pair.s, &r);
        second_loop.push(TwoLoopStep {
            pair: i,
            coefficient: beta,
            vector: r.clone(),
        });
    }

    let trace = TwoLoopTrace {
        first_loop,
        gamma,
        damped_gamma,
        second_loop,
    };
    (r, trace)
}

/// Rebuild the explicit approximate Hessian implied by `memory`.
///
/// Applies the two-loop recursion to each basis vector to form the implicit
/// inverse Hessian column by column, then inverts it. Returns `None` when the
/// implicit inverse is singular.
pub fn approximate_hessian<'a, F, I>(
    dim: usize,
    memory: I,
    hessian_damping: F,
) -> Option<Vec<Vec<F>>>
where
    F: Float,
    I: IntoIterator<Item = &'a MemoryPair<F>>,
{
    let pairs: Vec<&MemoryPair<F>> = memory.into_iter().collect();
    let mut inverse = vec![vec![F::zero(); dim]; dim];
    for (j, e) in identity::<F>(dim).iter().enumerate() {
        let (col, _) = two_loop_recursion(e, pairs.iter().copied(), hessian_damping);
        for (i, c) in col.into_iter().enumerate() {
            inverse[i][j] = c;
        }
    }
    invert_matrix(&inverse)
}
