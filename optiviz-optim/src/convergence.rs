//! Termination engine shared by every driver.
//!
//! After each step the driver reports the new loss, the new gradient norm and
//! the step taken; [`check_termination`] decides, in strict priority order,
//! whether the run diverged, converged (and by which criterion) or should
//! continue.

use std::fmt;

use optiviz::vector::{norm_l1, sub};
use optiviz::Float;

/// Termination thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tolerances<F> {
    /// Stop when `||∇f(w_new)|| < gtol`.
    pub gtol: F,
    /// Stop when the scipy-style relative function change is below `ftol`.
    pub ftol: F,
    /// Stop when `||w_new - w||_1 / d < xtol`.
    pub xtol: F,
}

impl Default for Tolerances<f64> {
    fn default() -> Self {
        Tolerances {
            gtol: 1e-6,
            ftol: 2.220446049250313e-9,
            xtol: 1e-9,
        }
    }
}

impl Default for Tolerances<f32> {
    fn default() -> Self {
        Tolerances {
            gtol: 1e-4,
            ftol: 1e-6,
            xtol: 1e-6,
        }
    }
}

impl<F: Float> Tolerances<F> {
    /// Keep `gtol` and switch off the loss-change and step-size checks.
    ///
    /// Both comparisons are strict, so a zero threshold never fires.
    pub fn gradient_only(self) -> Self {
        Tolerances {
            ftol: F::zero(),
            xtol: F::zero(),
            ..self
        }
    }
}

/// Parameters controlling convergence checks.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConvergenceParams<F> {
    /// Maximum number of iterations (default: 100).
    pub max_iter: usize,
    /// Termination thresholds.
    pub tolerances: Tolerances<F>,
}

impl Default for ConvergenceParams<f64> {
    fn default() -> Self {
        ConvergenceParams {
            max_iter: 100,
            tolerances: Tolerances::default(),
        }
    }
}

impl Default for ConvergenceParams<f32> {
    fn default() -> Self {
        ConvergenceParams {
            max_iter: 100,
            tolerances: Tolerances::default(),
        }
    }
}

/// Which check ended the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ConvergenceCriterion {
    Gradient,
    Ftol,
    Xtol,
    MaxIter,
    Diverged,
}

impl ConvergenceCriterion {
    /// True for the three criteria that count as convergence.
    pub fn is_convergence(self) -> bool {
        matches!(
            self,
            ConvergenceCriterion::Gradient | ConvergenceCriterion::Ftol | ConvergenceCriterion::Xtol
        )
    }

    /// Converged on loss or step progress without reaching a small gradient.
    pub fn is_stall(self) -> bool {
        matches!(self, ConvergenceCriterion::Ftol | ConvergenceCriterion::Xtol)
    }
}

impl fmt::Display for ConvergenceCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvergenceCriterion::Gradient => write!(f, "gradient"),
            ConvergenceCriterion::Ftol => write!(f, "ftol"),
            ConvergenceCriterion::Xtol => write!(f, "xtol"),
            ConvergenceCriterion::MaxIter => write!(f, "maxiter"),
            ConvergenceCriterion::Diverged => write!(f, "diverged"),
        }
    }
}

/// Whether the driver uses true second derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmOrder {
    FirstOrder,
    SecondOrder,
}

/// Quantities measured after one step, fed to [`check_termination`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepMeasures<F> {
    /// Loss at the new point.
    pub loss: F,
    /// Gradient norm at the new point.
    pub grad_norm: F,
    /// `|f_k - f_{k-1}| / max(|f_k|, |f_{k-1}|, 1)`.
    pub function_change: F,
    /// `||w_new - w||_1 / d`.
    pub step_size: F,
}

impl<F: Float> StepMeasures<F> {
    pub fn new(prev_loss: F, loss: F, grad_norm: F, w: &[F], w_new: &[F]) -> Self {
        StepMeasures {
            loss,
            grad_norm,
            function_change: relative_function_change(loss, prev_loss),
            step_size: relative_step_size(w_new, w),
        }
    }
}

/// scipy-style relative change `|f_new - f_old| / max(|f_new|, |f_old|, 1)`.
pub fn relative_function_change<F: Float>(f_new: F, f_old: F) -> F {
    let denom = f_new.abs().max(f_old.abs()).max(F::one());
    (f_new - f_old).abs() / denom
}

/// L1 norm of the step divided by the dimension. Zero for `d = 0`.
pub fn relative_step_size<F: Float>(w_new: &[F], w: &[F]) -> F {
    if w.is_empty() {
        return F::zero();
    }
    let d = F::from_usize(w.len()).unwrap_or_else(F::one);
    norm_l1(&sub(w_new, w)) / d
}

/// Apply the termination checks in priority order.
///
/// 1. non-finite loss or gradient norm: [`ConvergenceCriterion::Diverged`]
/// 2. `grad_norm < gtol`: [`ConvergenceCriterion::Gradient`]
/// 3. `function_change < ftol`: [`ConvergenceCriterion::Ftol`]
/// 4. `step_size < xtol`: [`ConvergenceCriterion::Xtol`]
///
/// Returns `None` when the run should continue.
pub fn check_termination<F: Float>(
    m: &StepMeasures<F>,
    tol: &Tolerances<F>,
) -> Option<ConvergenceCriterion> {
    if !m.loss.is_finite() || !m.grad_norm.is_finite() {
        return Some(ConvergenceCriterion::Diverged);
    }
    if m.grad_norm < tol.gtol {
        return Some(ConvergenceCriterion::Gradient);
    }
    if m.function_change < tol.ftol {
        return Some(ConvergenceCriterion::Ftol);
    }
    if m.step_size < tol.xtol {
        return Some(ConvergenceCriterion::Xtol);
    }
    None
}

fn sci<F: Float>(v: F) -> String {
    format!("{:.3e}", v.to_f64().unwrap_or(f64::NAN))
}

/// Render a human-readable termination message.
///
/// When the gradient criterion fired and Hessian eigenvalues are available,
/// a negative minimum eigenvalue is reported as a saddle point rather than a
/// minimum.
pub fn termination_message<F: Float>(
    criterion: ConvergenceCriterion,
    m: &StepMeasures<F>,
    tol: &Tolerances<F>,
    eigenvalues: Option<&[F]>,
    order: AlgorithmOrder,
    iterations: usize,
) -> String {
    match criterion {
        ConvergenceCriterion::Gradient => {
            let min_eig = eigenvalues.and_then(|e| {
                e.iter()
                    .copied()
                    .fold(None, |acc: Option<F>, v| Some(acc.map_or(v, |a| a.min(v))))
            });
            match min_eig {
                Some(lmin) if lmin < F::zero() => format!(
                    "Saddle point detected: NOT a minimum (gradient norm {} < gtol {}, \
                     but Hessian has negative eigenvalue {}) after {} iterations",
                    sci(m.grad_norm),
                    sci(tol.gtol),
                    sci(lmin),
                    iterations
                ),
                Some(lmin) if order == AlgorithmOrder::SecondOrder && lmin > F::zero() => format!(
                    "Converged (second-order convergence): gradient norm {} < gtol {} \
                     with all Hessian eigenvalues positive after {} iterations",
                    sci(m.grad_norm),
                    sci(tol.gtol),
                    iterations
                ),
                _ => format!(
                    "Converged (first-order convergence): gradient norm {} < gtol {} \
                     after {} iterations",
                    sci(m.grad_norm),
                    sci(tol.gtol),
                    iterations
                ),
            }
        }
        ConvergenceCriterion::Ftol => format!(
            "Stalled: relative function change {} < ftol {} after {} iterations \
             (gradient norm {} is still above gtol {})",
            sci(m.function_change),
            sci(tol.ftol),
            iterations,
            sci(m.grad_norm),
            sci(tol.gtol)
        ),
        ConvergenceCriterion::Xtol => format!(
            "Stalled: relative step size {} < xtol {} after {} iterations \
             (gradient norm {} is still above gtol {})",
            sci(m.step_size),
            sci(tol.xtol),
            iterations,
            sci(m.grad_norm),
            sci(tol.gtol)
        ),
        ConvergenceCriterion::MaxIter => format!(
            "Did not converge: reached max_iter = {} (gradient norm {}, loss {})",
            iterations,
            sci(m.grad_norm),
            sci(m.loss)
        ),
        ConvergenceCriterion::Diverged => format!(
            "Diverged at iteration {}: loss = {}, gradient norm = {}",
            iterations,
            sci(m.loss),
            sci(m.grad_norm)
        ),
    }
}
