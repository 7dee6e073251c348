//! Alternate pipeline: projection, unsupervised mixtures and their scoring.
//!
//! - [`pca`]: principal-axis projection fitted once and reused
//! - [`gmm`]: full-covariance Gaussian mixture trained by EM
//! - [`evaluate`]: clusters on the whole table, scored against true labels
//! - [`label_mixture`]: one projection + mixture per label, used to generate

pub mod evaluate;
pub mod gmm;
pub mod label_mixture;
pub mod pca;

pub use evaluate::{majority_labels, score_assignments, ClusterEvaluation, ClusterModel};
pub use gmm::{GaussianMixture, MixtureComponent};
pub use label_mixture::{fit_label_mixtures, LabelMixture};
pub use pca::Projection;
