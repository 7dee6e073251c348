//! Classification path: per-class estimation, likelihoods and posteriors.
//!
//! Data flows leaf-first:
//! [`estimator`] builds one [`ClassStatistics`] per observed label,
//! [`likelihood`] scores a sample under each class density, and
//! [`posterior`] combines those scores with the log-priors into a
//! normalized [`PosteriorVector`].

pub mod estimator;
pub mod likelihood;
pub mod posterior;

pub use estimator::{estimate, ClassStatistics};
pub use likelihood::{log_density, log_likelihood, log_likelihoods, rank_zero_labels};
pub use posterior::{
    compute_posterior, normalize_evidence, ClassEvidence, LabelProbability, PosteriorResult,
    PosteriorVector,
};

use dg_common::Error;

/// Surface a numerical failure from the math layer as a caller-visible error.
pub(crate) fn computation_error(context: &str, err: impl std::fmt::Display) -> Error {
    Error::InternalComputation(format!("{context}: {err}"))
}
