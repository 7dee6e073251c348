//! Projection + clustering evaluator.
//!
//! Fits a principal-axis projection on the whole table, a K-component
//! mixture on the projected rows, then scores the unsupervised clusters
//! against the true labels: every cluster takes the majority label of its
//! members (smallest label on ties), predictions substitute each row's
//! cluster through that map, and accuracy and a confusion matrix compare
//! predictions with the truth.

use std::collections::BTreeMap;

use dg_common::{Error, Label, Result, TrainingTable, NUM_LABELS, SAMPLE_LEN};
use dg_config::MixtureConfig;
use nalgebra::{DMatrix, DVector};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::gmm::GaussianMixture;
use super::pca::Projection;

/// Fitted projection and mixture, reusable across evaluations.
#[derive(Debug, Clone)]
pub struct ClusterModel {
    pub projection: Projection,
    pub mixture: GaussianMixture,
}

impl ClusterModel {
    /// Fit on every row of `table`.
    pub fn fit(
        table: &TrainingTable,
        dims: usize,
        clusters: usize,
        mixture: &MixtureConfig,
        rcond: f64,
    ) -> Result<Self> {
        if table.is_empty() {
            return Err(Error::EmptyTrainingTable);
        }
        if clusters > table.len() {
            return Err(Error::InvalidParameter {
                name: "clusters",
                message: format!(
                    "{clusters} clusters need at least {clusters} rows, got {}",
                    table.len()
                ),
            });
        }
        let data = table_matrix(table);
        let projection = Projection::fit(&data, dims, rcond)?;
        if projection.components() == 0 {
            return Err(Error::InvalidParameter {
                name: "dims",
                message: "training rows have no variance to project".to_string(),
            });
        }
        let projected = projection.transform_rows(&data)?;
        let mixture = GaussianMixture::fit(&projected, clusters, mixture)?;
        Ok(Self {
            projection,
            mixture,
        })
    }

    pub fn dims(&self) -> usize {
        self.projection.components()
    }

    pub fn clusters(&self) -> usize {
        self.mixture.n_components()
    }

    /// Cluster id of every row of `table`.
    pub fn assign(&self, table: &TrainingTable) -> Result<Vec<usize>> {
        let projected = self.projection.transform_rows(&table_matrix(table))?;
        self.mixture.predict_rows(&projected)
    }

    /// Score the clustering of `table` against its labels.
    pub fn evaluate(&self, table: &TrainingTable) -> Result<ClusterEvaluation> {
        if table.is_empty() {
            return Err(Error::EmptyTrainingTable);
        }
        let assignments = self.assign(table)?;
        let truth = table.truth();
        Ok(score_assignments(assignments, &truth))
    }

    /// Project one vector into the fitted subspace.
    pub fn project(&self, x: &[f64]) -> Result<DVector<f64>> {
        self.projection.transform(x)
    }
}

/// Outcome of scoring clusters against ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClusterEvaluation {
    /// Cluster id per row, in table order.
    pub assignments: Vec<usize>,
    /// Majority true label of each non-empty cluster.
    pub cluster_labels: BTreeMap<usize, Label>,
    /// Predicted label per row.
    pub predicted: Vec<Label>,
    /// Fraction of rows whose predicted label equals the truth.
    pub accuracy: f64,
    /// `confusion[true][predicted]` row counts.
    pub confusion: Vec<Vec<usize>>,
}

/// Build the cluster→label map, predictions, accuracy and confusion matrix.
pub fn score_assignments(assignments: Vec<usize>, truth: &[Label]) -> ClusterEvaluation {
    let cluster_labels = majority_labels(&assignments, truth);

    let predicted: Vec<Label> = assignments
        .iter()
        .filter_map(|c| cluster_labels.get(c).copied())
        .collect();

    let mut confusion = vec![vec![0usize; NUM_LABELS]; NUM_LABELS];
    let mut correct = 0usize;
    for (t, p) in truth.iter().zip(&predicted) {
        confusion[t.index()][p.index()] += 1;
        if t == p {
            correct += 1;
        }
    }
    let accuracy = if truth.is_empty() {
        0.0
    } else {
        correct as f64 / truth.len() as f64
    };

    ClusterEvaluation {
        assignments,
        cluster_labels,
        predicted,
        accuracy,
        confusion,
    }
}

/// Majority label per cluster; the smallest label wins ties.
pub fn majority_labels(assignments: &[usize], truth: &[Label]) -> BTreeMap<usize, Label> {
    let mut votes: BTreeMap<usize, [usize; NUM_LABELS]> = BTreeMap::new();
    for (&cluster, label) in assignments.iter().zip(truth) {
        votes.entry(cluster).or_insert([0; NUM_LABELS])[label.index()] += 1;
    }
    votes
        .into_iter()
        .map(|(cluster, counts)| {
            let mut best = 0;
            for (idx, &count) in counts.iter().enumerate() {
                if count > counts[best] {
                    best = idx;
                }
            }
            (cluster, Label::ALL[best])
        })
        .collect()
}

/// `n × 784` matrix of the table's samples as floats.
pub(crate) fn table_matrix(table: &TrainingTable) -> DMatrix<f64> {
    let rows: Vec<_> = table.samples().collect();
    DMatrix::from_fn(rows.len(), SAMPLE_LEN, |i, j| f64::from(rows[i].pixels()[j]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(values: &[i64]) -> Vec<Label> {
        values.iter().map(|&v| Label::new(v).unwrap()).collect()
    }

    #[test]
    fn test_majority_vote() {
        let map = majority_labels(&[0, 0, 0, 1, 1], &labels(&[3, 3, 5, 8, 8]));
        assert_eq!(map[&0].value(), 3);
        assert_eq!(map[&1].value(), 8);
    }

    #[test]
    fn test_majority_tie_goes_to_smallest_label() {
        let map = majority_labels(&[2, 2, 2, 2], &labels(&[9, 4, 9, 4]));
        assert_eq!(map[&2].value(), 4);
    }

    #[test]
    fn test_perfect_clusters_score_one() {
        let eval = score_assignments(vec![1, 1, 0, 0, 2], &labels(&[7, 7, 2, 2, 5]));
        assert_eq!(eval.accuracy, 1.0);
        assert_eq!(eval.confusion[7][7], 2);
        assert_eq!(eval.confusion[2][2], 2);
        assert_eq!(eval.confusion[5][5], 1);
        let off_diagonal: usize = (0..NUM_LABELS)
            .flat_map(|t| (0..NUM_LABELS).map(move |p| (t, p)))
            .filter(|(t, p)| t != p)
            .map(|(t, p)| eval.confusion[t][p])
            .sum();
        assert_eq!(off_diagonal, 0);
    }

    #[test]
    fn test_mixed_cluster_accuracy() {
        // Cluster 0 holds {1, 1, 2}: predicted 1 for all three.
        let eval = score_assignments(vec![0, 0, 0, 1], &labels(&[1, 1, 2, 3]));
        assert!((eval.accuracy - 0.75).abs() < 1e-12);
        assert_eq!(eval.confusion[2][1], 1);
        assert_eq!(eval.predicted, labels(&[1, 1, 1, 3]));
    }

    #[test]
    fn test_too_many_clusters_rejected() {
        let mut table = TrainingTable::new();
        table.push(dg_common::Sample::zeros(), Label::new(0).unwrap());
        let err = ClusterModel::fit(&table, 2, 3, &MixtureConfig::default(), dg_math::DEFAULT_RCOND)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "clusters", .. }));
    }
}
