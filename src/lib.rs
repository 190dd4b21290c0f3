//! Dense numerics underpinning the `optiviz-optim` optimizers.
//!
//! Vectors are plain slices and matrices are row-major `Vec<Vec<F>>`, which
//! keeps the iteration traces produced by the optimizers directly inspectable.

pub mod eigen;
pub mod float;
pub mod linalg;
#[cfg(feature = "serde")]
pub mod serde_float;
pub mod vector;

pub use eigen::{
    classify, condition_number, eigen_pairs_2x2, eigenvalues_2x2, eigenvalues_3x3,
    symmetric_eigenvalues, Definiteness, EigenPair,
};
pub use float::Float;
pub use linalg::{invert_matrix, shift_diagonal};
