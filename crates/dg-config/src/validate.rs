//! Configuration validation errors and semantic validation.

use dg_common::SAMPLE_LEN;
use thiserror::Error;

use crate::engine::EngineConfig;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 71,
            ValidationError::ParseError(_) => 72,
            ValidationError::InvalidValue { .. } => 73,
            ValidationError::VersionMismatch { .. } => 74,
        }
    }
}

impl From<ValidationError> for dg_common::Error {
    fn from(err: ValidationError) -> Self {
        dg_common::Error::Config(err.to_string())
    }
}

/// Validate engine configuration semantically.
pub fn validate_config(config: &EngineConfig) -> ValidationResult<()> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    validate_dims("pca_components", config.pca_components)?;
    validate_dims("cluster_dims", config.cluster_dims)?;
    validate_positive_count("gmm_components", config.gmm_components)?;
    validate_positive_count("cluster_count", config.cluster_count)?;

    let mixture = &config.mixture;
    validate_positive_count("mixture.max_iterations", mixture.max_iterations)?;
    validate_positive_count("mixture.n_init", mixture.n_init)?;
    validate_positive_real("mixture.tolerance", mixture.tolerance)?;
    validate_positive_real("mixture.reg_covar", mixture.reg_covar)?;

    validate_positive_real("support_rcond", config.support_rcond)?;
    if config.support_rcond >= 1.0 {
        return Err(ValidationError::InvalidValue {
            field: "support_rcond".to_string(),
            message: format!("Must be below 1, got {}", config.support_rcond),
        });
    }

    Ok(())
}

fn validate_positive_count(field: &str, value: usize) -> ValidationResult<()> {
    if value == 0 {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: "Must be at least 1".to_string(),
        });
    }
    Ok(())
}

/// A projection cannot have more axes than a sample has pixels.
fn validate_dims(field: &str, value: usize) -> ValidationResult<()> {
    validate_positive_count(field, value)?;
    if value > SAMPLE_LEN {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("Must be at most {}, got {}", SAMPLE_LEN, value),
        });
    }
    Ok(())
}

fn validate_positive_real(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("Must be positive and finite, got {}", value),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_components_rejected() {
        let mut config = EngineConfig::default();
        config.gmm_components = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { ref field, .. } if field == "gmm_components"));
    }

    #[test]
    fn test_projection_larger_than_sample_rejected() {
        let mut config = EngineConfig::default();
        config.pca_components = SAMPLE_LEN + 1;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_non_positive_tolerance_rejected() {
        let mut config = EngineConfig::default();
        config.mixture.tolerance = 0.0;
        assert!(validate_config(&config).is_err());
        config.mixture.tolerance = f64::NAN;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rcond_bounds() {
        let mut config = EngineConfig::default();
        config.support_rcond = 1.0;
        assert!(validate_config(&config).is_err());
        config.support_rcond = f64::INFINITY;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_version_mismatch() {
        let mut config = EngineConfig::default();
        config.schema_version = "0.9.0".to_string();
        let err = validate_config(&config).unwrap_err();
        assert_eq!(err.code(), 74);
        assert!(err.to_string().contains("0.9.0"));
    }

    #[test]
    fn test_converts_to_common_error() {
        let err: dg_common::Error = ValidationError::ParseError("bad".into()).into();
        assert_eq!(err.category(), dg_common::ErrorCategory::Config);
    }
}
