//! Engine configuration types.
//!
//! These types match the `engine.json` file. Every field has a default, so a
//! partial file only overrides what it names.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::validate::{ValidationError, ValidationResult};

/// Environment variable overriding [`EngineConfig::pca_components`].
pub const ENV_PCA_COMPONENTS: &str = "DG_PCA_COMPONENTS";
/// Environment variable overriding [`EngineConfig::gmm_components`].
pub const ENV_GMM_COMPONENTS: &str = "DG_GMM_COMPONENTS";
/// Environment variable overriding [`EngineConfig::train_data_path`].
pub const ENV_TRAIN_DATA_PATH: &str = "DG_TRAIN_DATA_PATH";

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EngineConfig {
    pub schema_version: String,

    /// Projection dimensions of each per-label generator.
    pub pca_components: usize,

    /// Mixture components of each per-label generator.
    pub gmm_components: usize,

    /// Projection dimensions of the clustering evaluator.
    pub cluster_dims: usize,

    /// Mixture components of the clustering evaluator.
    pub cluster_count: usize,

    pub mixture: MixtureConfig,

    /// Relative eigenvalue cutoff for a class covariance's support.
    pub support_rcond: f64,

    /// Seed for generative sampling; entropy-seeded when absent.
    pub sample_seed: Option<u64>,

    /// Training CSV used when no path is given on the command line.
    pub train_data_path: Option<PathBuf>,
}

/// Expectation-maximization settings shared by every mixture fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MixtureConfig {
    pub max_iterations: usize,

    /// Stop once the mean log-likelihood improves by less than this.
    pub tolerance: f64,

    /// Added to every covariance diagonal.
    pub reg_covar: f64,

    /// Independent initializations; the best log-likelihood wins.
    pub n_init: usize,

    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            pca_components: 50,
            gmm_components: 5,
            cluster_dims: 2,
            cluster_count: 10,
            mixture: MixtureConfig::default(),
            support_rcond: dg_math::DEFAULT_RCOND,
            sample_seed: None,
            train_data_path: None,
        }
    }
}

impl Default for MixtureConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-3,
            reg_covar: 1e-6,
            n_init: 3,
            seed: 42,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> ValidationResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_str(&content)
    }

    /// Parse configuration from a JSON string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(json: &str) -> ValidationResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e)))
    }

    /// Apply `DG_*` environment overrides, returning the variables applied.
    pub fn apply_env_overrides(&mut self) -> ValidationResult<Vec<&'static str>> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> ValidationResult<Vec<&'static str>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = Vec::new();

        if let Some(raw) = lookup(ENV_PCA_COMPONENTS) {
            self.pca_components = parse_count(ENV_PCA_COMPONENTS, &raw)?;
            applied.push(ENV_PCA_COMPONENTS);
        }
        if let Some(raw) = lookup(ENV_GMM_COMPONENTS) {
            self.gmm_components = parse_count(ENV_GMM_COMPONENTS, &raw)?;
            applied.push(ENV_GMM_COMPONENTS);
        }
        if let Some(raw) = lookup(ENV_TRAIN_DATA_PATH) {
            if !raw.trim().is_empty() {
                self.train_data_path = Some(PathBuf::from(raw));
                applied.push(ENV_TRAIN_DATA_PATH);
            }
        }

        Ok(applied)
    }
}

fn parse_count(field: &str, raw: &str) -> ValidationResult<usize> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("expected a non-negative integer, got {:?}", raw),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.pca_components, 50);
        assert_eq!(config.gmm_components, 5);
        assert_eq!(config.cluster_dims, 2);
        assert_eq!(config.cluster_count, 10);
        assert_eq!(config.mixture.n_init, 3);
        assert!(config.sample_seed.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = EngineConfig::from_str(r#"{"cluster_count": 4, "mixture": {"seed": 7}}"#)
            .unwrap();
        assert_eq!(config.cluster_count, 4);
        assert_eq!(config.mixture.seed, 7);
        assert_eq!(config.mixture.max_iterations, 100);
        assert_eq!(config.pca_components, 50);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            EngineConfig::from_str("{not json"),
            Err(ValidationError::ParseError(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_PCA_COMPONENTS, "20"),
            (ENV_TRAIN_DATA_PATH, "/data/train.csv"),
        ]
        .into_iter()
        .collect();
        let mut config = EngineConfig::default();
        let applied = config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(applied, vec![ENV_PCA_COMPONENTS, ENV_TRAIN_DATA_PATH]);
        assert_eq!(config.pca_components, 20);
        assert_eq!(config.gmm_components, 5);
        assert_eq!(
            config.train_data_path,
            Some(PathBuf::from("/data/train.csv"))
        );
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut config = EngineConfig::default();
        let err = config
            .apply_overrides(|k| (k == ENV_GMM_COMPONENTS).then(|| "five".to_string()))
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { ref field, .. } if field == ENV_GMM_COMPONENTS));
    }
}
