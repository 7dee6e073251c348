//! digit-gauss engine configuration loading and validation.
//!
//! This crate provides:
//! - The typed `engine.json` structure
//! - Config resolution (CLI → env → XDG → /etc → defaults)
//! - Environment overrides and semantic validation
//! - Config snapshots recording where the effective values came from

pub mod engine;
pub mod resolve;
pub mod snapshot;
pub mod validate;

use std::path::Path;

pub use engine::{EngineConfig, MixtureConfig};
pub use resolve::{resolve_config, ConfigPaths, ConfigSource};
pub use snapshot::ConfigSnapshot;
pub use validate::{validate_config, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";

/// A resolved, overridden and validated configuration.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: EngineConfig,
    pub paths: ConfigPaths,
    pub snapshot: ConfigSnapshot,
}

/// Resolve, read, apply environment overrides and validate.
///
/// An explicit `cli_path` that does not exist is an error rather than a
/// silent fall-through to the next source.
pub fn load_config(cli_path: Option<&Path>) -> ValidationResult<LoadedConfig> {
    let paths = resolve_config(cli_path);
    if let Some(requested) = cli_path {
        if paths.source != ConfigSource::CliArgument {
            return Err(ValidationError::IoError(format!(
                "config file not found: {}",
                requested.display()
            )));
        }
    }

    let (mut config, content) = match &paths.engine {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|e| {
                ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
            })?;
            (EngineConfig::from_str(&content)?, Some(content))
        }
        None => (EngineConfig::default(), None),
    };

    let overrides = config.apply_env_overrides()?;
    validate_config(&config)?;

    let snapshot = ConfigSnapshot::new(&config, &paths, content.as_deref(), &overrides);
    Ok(LoadedConfig {
        config,
        paths,
        snapshot,
    })
}
