//! Posterior computation P(label | sample).
//!
//! Combines per-class log-likelihoods with log-priors and normalizes with
//! the max-shifted log-sum-exp reduction, so the result is unchanged by
//! adding a constant to every log-posterior and never divides by zero.

use dg_common::{Error, Label, LabelTable, Result, Sample};
use dg_math::{log_sum_exp, normalize_exp};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::estimator::ClassStatistics;
use super::likelihood::log_likelihood;

/// Unnormalized evidence for one class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClassEvidence {
    pub label: Label,
    pub log_likelihood: f64,
    pub log_prior: f64,
}

impl ClassEvidence {
    pub fn log_posterior(&self) -> f64 {
        self.log_likelihood + self.log_prior
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LabelProbability {
    pub label: Label,
    pub probability: f64,
}

/// Normalized probabilities over the observed labels, in ascending label
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct PosteriorVector {
    entries: Vec<LabelProbability>,
}

impl PosteriorVector {
    pub fn get(&self, label: Label) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| e.probability)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabelProbability> + '_ {
        self.entries.iter()
    }

    pub fn labels(&self) -> Vec<Label> {
        self.entries.iter().map(|e| e.label).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.probability).sum()
    }
}

/// Full posterior computation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PosteriorResult {
    pub posterior: PosteriorVector,
    /// `log Σ_L p(x | L) p(L)`, the log marginal likelihood of the sample.
    pub log_evidence: f64,
    pub evidence: Vec<ClassEvidence>,
}

/// Normalize per-class evidence into a posterior.
///
/// Entries must be in ascending label order; the output keeps that order.
pub fn normalize_evidence(evidence: &[ClassEvidence]) -> Result<PosteriorResult> {
    if evidence.is_empty() {
        return Err(Error::InternalComputation(
            "no class evidence to normalize".to_string(),
        ));
    }
    let log_post: Vec<f64> = evidence.iter().map(ClassEvidence::log_posterior).collect();
    let probs = normalize_exp(&log_post);
    if probs.iter().any(|p| !p.is_finite()) {
        return Err(Error::InternalComputation(
            "posterior normalization produced a non-finite value".to_string(),
        ));
    }

    let entries = evidence
        .iter()
        .zip(probs)
        .map(|(e, probability)| LabelProbability {
            label: e.label,
            probability,
        })
        .collect();

    Ok(PosteriorResult {
        posterior: PosteriorVector { entries },
        log_evidence: log_sum_exp(&log_post),
        evidence: evidence.to_vec(),
    })
}

/// Compute P(label | sample) for every fitted class.
pub fn compute_posterior(
    stats: &LabelTable<ClassStatistics>,
    sample: &Sample,
) -> Result<PosteriorResult> {
    let evidence = stats
        .iter()
        .map(|(label, class)| {
            Ok(ClassEvidence {
                label,
                log_likelihood: log_likelihood(class, sample)?,
                log_prior: class.log_prior,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    normalize_evidence(&evidence)
}
