//! Configuration snapshots for reproducibility.
//!
//! A snapshot captures the effective configuration at startup so that model
//! summaries and logs can be tied to the exact settings that produced them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::engine::EngineConfig;
use crate::resolve::{ConfigPaths, ConfigSource};

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    /// Schema version of the configuration.
    pub schema_version: String,

    /// SHA-256 hash of the engine.json content.
    #[serde(default)]
    pub file_hash: Option<String>,

    /// Path where the file was loaded from.
    #[serde(default)]
    pub path: Option<String>,

    /// Source of the configuration file.
    pub source: String,

    /// Environment variables that overrode file values.
    #[serde(default)]
    pub env_overrides: Vec<String>,

    /// SHA-256 hash of the effective configuration (after overrides).
    pub effective_hash: String,

    /// The effective configuration.
    pub config: EngineConfig,
}

impl ConfigSnapshot {
    /// Create a new snapshot from loaded configuration.
    pub fn new(
        config: &EngineConfig,
        paths: &ConfigPaths,
        file_content: Option<&str>,
        env_overrides: &[&str],
    ) -> Self {
        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: config.schema_version.clone(),
            file_hash: file_content.map(hash_content),
            path: paths.engine.as_ref().map(|p| p.display().to_string()),
            source: paths.source.to_string(),
            env_overrides: env_overrides.iter().map(|s| s.to_string()).collect(),
            effective_hash: effective_hash(config),
            config: config.clone(),
        }
    }

    /// Create a snapshot with only defaults (no config file loaded).
    pub fn defaults_only() -> Self {
        let config = EngineConfig::default();
        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: config.schema_version.clone(),
            file_hash: None,
            path: None,
            source: ConfigSource::BuiltinDefault.to_string(),
            env_overrides: Vec::new(),
            effective_hash: effective_hash(&config),
            config,
        }
    }

    /// Serialize snapshot to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check if this snapshot has the same effective configuration.
    pub fn matches(&self, other: &ConfigSnapshot) -> bool {
        self.effective_hash == other.effective_hash
    }

    /// Get a short identifier for this snapshot (first 12 chars of hash).
    pub fn short_id(&self) -> &str {
        &self.effective_hash[..12.min(self.effective_hash.len())]
    }
}

fn effective_hash(config: &EngineConfig) -> String {
    // Struct fields serialize in declaration order, so this is stable.
    let canonical = serde_json::to_string(config).unwrap_or_default();
    hash_content(&canonical)
}

/// Hash content with SHA-256 and return hex string.
fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
