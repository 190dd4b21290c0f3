use std::fmt;

use optiviz::Float;

use crate::error::OptimError;

/// Trait for optimization objectives.
///
/// Implementors provide function and gradient evaluation. Methods take
/// `&self`: the drivers never mutate the problem, so one problem value can be
/// shared by any number of concurrent runs.
pub trait Objective<F: Float> {
    /// Number of input variables.
    fn dim(&self) -> usize;

    /// Evaluate `f(w)`.
    fn value(&self, w: &[F]) -> F;

    /// Evaluate `∇f(w)`.
    fn gradient(&self, w: &[F]) -> Vec<F>;

    /// Evaluate the objective and its gradient at `w`.
    ///
    /// Returns `(f(w), ∇f(w))`.
    fn eval_grad(&self, w: &[F]) -> (F, Vec<F>) {
        (self.value(w), self.gradient(w))
    }
}

/// An objective that can also supply its Hessian.
///
/// Second-order drivers are generic over this trait, so handing them a
/// gradient-only problem is a compile-time error. For runtime-assembled
/// problems see [`ProblemFunctions::require_hessian`].
pub trait HessianObjective<F: Float>: Objective<F> {
    /// Evaluate `H(w)` where `H[i][j] = ∂²f/∂w_i∂w_j`.
    fn hessian(&self, w: &[F]) -> Vec<Vec<F>>;
}

type ScalarFn<F> = Box<dyn Fn(&[F]) -> F + Send + Sync>;
type VectorFn<F> = Box<dyn Fn(&[F]) -> Vec<F> + Send + Sync>;
type MatrixFn<F> = Box<dyn Fn(&[F]) -> Vec<Vec<F>> + Send + Sync>;

/// A problem assembled from closures, with an optional Hessian.
///
/// This is the shape in which an external problem catalog hands problems to
/// the engine. The Hessian capability is resolved once, at call entry, via
/// [`capability`](Self::capability) or [`require_hessian`](Self::require_hessian).
pub struct ProblemFunctions<F> {
    objective: ScalarFn<F>,
    gradient: VectorFn<F>,
    hessian: Option<MatrixFn<F>>,
    dimensionality: usize,
}

/// A [`ProblemFunctions`] resolved by Hessian capability.
pub enum ProblemKind<'a, F> {
    GradientOnly(&'a ProblemFunctions<F>),
    HessianCapable(HessianCapable<'a, F>),
}

/// Borrowed view of a [`ProblemFunctions`] that is known to carry a Hessian.
pub struct HessianCapable<'a, F> {
    problem: &'a ProblemFunctions<F>,
    hessian: &'a MatrixFn<F>,
}

impl<F: Float> ProblemFunctions<F> {
    /// Create a gradient-only problem.
    pub fn new(
        dimensionality: usize,
        objective: impl Fn(&[F]) -> F + Send + Sync + 'static,
        gradient: impl Fn(&[F]) -> Vec<F> + Send + Sync + 'static,
    ) -> Self {
        ProblemFunctions {
            objective: Box::new(objective),
            gradient: Box::new(gradient),
            hessian: None,
            dimensionality,
        }
    }

    /// Attach a Hessian.
    pub fn with_hessian(
        mut self,
        hessian: impl Fn(&[F]) -> Vec<Vec<F>> + Send + Sync + 'static,
    ) -> Self {
        self.hessian = Some(Box::new(hessian));
        self
    }

    pub fn dimensionality(&self) -> usize {
        self.dimensionality
    }

    pub fn has_hessian(&self) -> bool {
        self.hessian.is_some()
    }

    /// Resolve the problem's capability.
    pub fn capability(&self) -> ProblemKind<'_, F> {
        match &self.hessian {
            Some(hessian) => ProblemKind::HessianCapable(HessianCapable {
                problem: self,
                hessian,
            }),
            None => ProblemKind::GradientOnly(self),
        }
    }

    /// Borrow the problem as a [`HessianObjective`], or fail with
    /// [`OptimError::MissingHessian`] naming `algorithm`.
    pub fn require_hessian(
        &self,
        algorithm: &'static str,
    ) -> Result<HessianCapable<'_, F>, OptimError> {
        match self.capability() {
            ProblemKind::HessianCapable(view) => Ok(view),
            ProblemKind::GradientOnly(_) => Err(OptimError::MissingHessian { algorithm }),
        }
    }
}

impl<F> fmt::Debug for ProblemFunctions<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProblemFunctions")
            .field("dimensionality", &self.dimensionality)
            .field("has_hessian", &self.hessian.is_some())
            .finish()
    }
}

impl<F: Float> Objective<F> for ProblemFunctions<F> {
    fn dim(&self) -> usize {
        self.dimensionality
    }

    fn value(&self, w: &[F]) -> F {
        (self.objective)(w)
    }

    fn gradient(&self, w: &[F]) -> Vec<F> {
        (self.gradient)(w)
    }
}

impl<F: Float> Objective<F> for HessianCapable<'_, F> {
    fn dim(&self) -> usize {
        self.problem.dimensionality
    }

    fn value(&self, w: &[F]) -> F {
        self.problem.value(w)
    }

    fn gradient(&self, w: &[F]) -> Vec<F> {
        self.problem.gradient(w)
    }
}

impl<F: Float> HessianObjective<F> for HessianCapable<'_, F> {
    fn hessian(&self, w: &[F]) -> Vec<Vec<F>> {
        (self.hessian)(w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bowl() -> ProblemFunctions<f64> {
        ProblemFunctions::new(
            2,
            |w: &[f64]| w[0] * w[0] + w[1] * w[1],
            |w: &[f64]| vec![2.0 * w[0], 2.0 * w[1]],
        )
    }

    #[test]
    fn gradient_only_problem() {
        let p = bowl();
        assert!(!p.has_hessian());
        assert!(matches!(p.capability(), ProblemKind::GradientOnly(_)));
        assert_eq!(
            p.require_hessian("newton").err(),
            Some(OptimError::MissingHessian { algorithm: "newton" })
        );
        assert_eq!(p.eval_grad(&[1.0, -2.0]), (5.0, vec![2.0, -4.0]));
    }

    #[test]
    fn hessian_capable_view_delegates() {
        let p = bowl().with_hessian(|_| vec![vec![2.0, 0.0], vec![0.0, 2.0]]);
        let view = p.require_hessian("newton").unwrap();
        assert_eq!(view.dim(), 2);
        assert_eq!(view.value(&[1.0, 1.0]), 2.0);
        assert_eq!(view.hessian(&[0.0, 0.0])[1][1], 2.0);
        assert_eq!(
            format!("{:?}", p),
            "ProblemFunctions { dimensionality: 2, has_hessian: true }"
        );
    }
}
