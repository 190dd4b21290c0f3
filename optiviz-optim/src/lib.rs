//! Minimizers with full iteration traces.
//!
//! Five drivers share one loop shape and one termination engine:
//! fixed-step and line-search gradient descent, damped Newton, L-BFGS and a
//! diagonal preconditioner. Every run returns an [`AlgorithmResult`] holding
//! a record per iteration plus a summary; configuration problems are the only
//! errors.

pub mod convergence;
pub mod error;
pub mod line_search;
pub mod minimize;
pub mod objective;
pub mod result;
pub mod solvers;

pub use convergence::{ConvergenceCriterion, ConvergenceParams, Tolerances};
pub use error::OptimError;
pub use line_search::{ArmijoParams, LineSearchStatus, StepRule};
pub use minimize::{minimize, Algorithm, AlgorithmOptions, AlgorithmRun, LineSearchKind};
pub use objective::{HessianObjective, Objective, ProblemFunctions, ProblemKind};
pub use result::{AlgorithmResult, AlgorithmSummary, DirectionSource, IterationRecord};
pub use solvers::diagonal::{
    diagonal_preconditioner, DiagonalPreconditionerConfig, PreconditionerDetails,
};
pub use solvers::gradient_descent::{
    gradient_descent, gradient_descent_line_search, GradientDescentConfig, LineSearchGdConfig,
};
pub use solvers::lbfgs::{lbfgs, LbfgsConfig, LbfgsDetails, MemoryPair};
pub use solvers::newton::{newton, NewtonConfig, NewtonDetails};
