//! Configuration errors raised before any iteration runs.
//!
//! Numerical trouble during a run (divergence, a singular Hessian, an
//! exhausted line search) is never an error: it is recorded in the returned
//! [`AlgorithmResult`](crate::AlgorithmResult).

use thiserror::Error;

/// Errors returned by the drivers and [`minimize`](crate::minimize).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptimError {
    /// The algorithm needs second derivatives but the problem has none.
    #[error("{algorithm} requires a Hessian, but the problem only provides a gradient")]
    MissingHessian { algorithm: &'static str },

    /// The algorithm needs explicit gtol/ftol/xtol thresholds.
    #[error("{algorithm} requires explicit termination thresholds (gtol, ftol, xtol)")]
    MissingTolerances { algorithm: &'static str },

    /// `max_iter` must be positive.
    #[error("max_iter must be greater than zero")]
    ZeroMaxIter,

    /// The initial point does not match the problem dimensionality.
    #[error("initial point has dimension {actual}, problem expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A numeric option is outside its valid range.
    #[error("invalid {name}: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },

    /// An algorithm name could not be parsed.
    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),
}
