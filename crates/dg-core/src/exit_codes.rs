//! Exit codes for the dg-core CLI.
//!
//! Exit code ranges:
//! - 0: success
//! - 10-19: user/input errors (recoverable by user action)
//! - 20-29: internal errors (bugs, should be reported)

use dg_common::{Error, ErrorCategory};

/// Exit codes for dg-core operations.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Clean = 0,

    // ========================================================================
    // User / Input Errors (10-19)
    // ========================================================================
    /// Invalid arguments
    ArgsError = 10,

    /// Sample has the wrong length or an out-of-range pixel
    SampleInvalid = 11,

    /// Label outside 0-9
    LabelInvalid = 12,

    /// A model was used before it was fitted
    ModelNotReady = 13,

    /// Configuration could not be loaded or validated
    ConfigError = 14,

    /// Training data could not be parsed
    DatasetError = 15,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (numerical failure or bug)
    InternalError = 20,

    /// I/O error
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Clean
    }

    /// Codes 10-19 can be resolved by user action.
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    pub fn is_internal_error(self) -> bool {
        (self as i32) >= 20
    }

    /// Get the error code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::SampleInvalid => "ERR_SAMPLE",
            ExitCode::LabelInvalid => "ERR_LABEL",
            ExitCode::ModelNotReady => "ERR_MODEL_NOT_READY",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::DatasetError => "ERR_DATASET",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }

    /// Map an engine error onto its exit code.
    pub fn for_error(err: &Error) -> Self {
        match err.category() {
            ErrorCategory::SampleValidation => ExitCode::SampleInvalid,
            ErrorCategory::LabelOutOfRange => ExitCode::LabelInvalid,
            ErrorCategory::ModelNotInitialized => ExitCode::ModelNotReady,
            ErrorCategory::InvalidArgument => ExitCode::ArgsError,
            ErrorCategory::InternalComputation => ExitCode::InternalError,
            ErrorCategory::Dataset => ExitCode::DatasetError,
            ErrorCategory::Config => ExitCode::ConfigError,
            ErrorCategory::Io => ExitCode::IoError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dg_common::ModelKind;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Clean.as_i32(), 0);
        assert_eq!(ExitCode::ArgsError.as_i32(), 10);
        assert_eq!(ExitCode::InternalError.as_i32(), 20);
    }

    #[test]
    fn test_ranges() {
        assert!(ExitCode::Clean.is_success());
        assert!(ExitCode::LabelInvalid.is_user_error());
        assert!(!ExitCode::LabelInvalid.is_internal_error());
        assert!(ExitCode::IoError.is_internal_error());
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            ExitCode::for_error(&Error::SampleLength { actual: 783 }),
            ExitCode::SampleInvalid
        );
        assert_eq!(
            ExitCode::for_error(&Error::LabelOutOfRange { label: 10 }),
            ExitCode::LabelInvalid
        );
        assert_eq!(
            ExitCode::for_error(&Error::ModelNotInitialized {
                model: ModelKind::ClassStatistics
            }),
            ExitCode::ModelNotReady
        );
        assert_eq!(
            ExitCode::for_error(&Error::InternalComputation("nan".into())),
            ExitCode::InternalError
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ExitCode::DatasetError), "ERR_DATASET (15)");
    }
}
