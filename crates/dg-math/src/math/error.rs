//! Errors raised by the linear-algebra kernels.

use thiserror::Error;

pub type LinalgResult<T> = Result<T, LinalgError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinalgError {
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("non-finite value in {0}")]
    NotFinite(&'static str),

    #[error("symmetric eigendecomposition did not converge for a {dim}x{dim} matrix")]
    NoConvergence { dim: usize },

    #[error("matrix is not positive definite")]
    NotPositiveDefinite,
}
