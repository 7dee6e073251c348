//! The labeled training table.

use sha2::{Digest, Sha256};

use crate::label::{Label, LabelTable};
use crate::sample::Sample;

/// Ordered `(sample, label)` rows.
///
/// Consumers only read the table; nothing in the engine mutates a table it
/// was handed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingTable {
    rows: Vec<(Sample, Label)>,
}

impl TrainingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, sample: Sample, label: Label) {
        self.rows.push((sample, label));
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Sample, Label)> + '_ {
        self.rows.iter().map(|(sample, label)| (sample, *label))
    }

    pub fn samples(&self) -> impl Iterator<Item = &Sample> + '_ {
        self.rows.iter().map(|(sample, _)| sample)
    }

    /// Ground-truth labels in row order.
    pub fn truth(&self) -> Vec<Label> {
        self.rows.iter().map(|(_, label)| *label).collect()
    }

    /// Distinct labels present, ascending.
    pub fn labels(&self) -> Vec<Label> {
        self.counts().labels()
    }

    /// Samples carrying `label`, in row order.
    pub fn rows_with(&self, label: Label) -> impl Iterator<Item = &Sample> + '_ {
        self.rows
            .iter()
            .filter(move |(_, l)| *l == label)
            .map(|(sample, _)| sample)
    }

    pub fn count(&self, label: Label) -> usize {
        self.rows.iter().filter(|(_, l)| *l == label).count()
    }

    /// Row count per observed label.
    pub fn counts(&self) -> LabelTable<usize> {
        let mut counts = [0usize; crate::label::NUM_LABELS];
        for (_, label) in &self.rows {
            counts[label.index()] += 1;
        }
        Label::ALL
            .iter()
            .filter(|label| counts[label.index()] > 0)
            .map(|label| (*label, counts[label.index()]))
            .collect()
    }

    /// SHA-256 over every row (label byte then pixels), hex encoded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (sample, label) in &self.rows {
            hasher.update([label.value()]);
            hasher.update(sample.pixels());
        }
        hex::encode(hasher.finalize())
    }
}

impl FromIterator<(Sample, Label)> for TrainingTable {
    fn from_iter<I: IntoIterator<Item = (Sample, Label)>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}
