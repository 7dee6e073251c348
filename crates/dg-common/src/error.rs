//! Error types for digit-gauss.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for automation
//! - Remediation suggestions for humans
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Invalid Sample
//!   Reason: sample length must be 784 (783 given)
//!   Fix: Send exactly 784 pixel values (a flattened 28x28 image), each in 0-255.
//! ```
//!
//! # Agent-Facing Output
//!
//! ```json
//! {
//!   "code": 10,
//!   "category": "sample_validation",
//!   "message": "sample length must be 784 (783 given)",
//!   "recoverable": true,
//!   "suggested_action": "fix_sample",
//!   "context": { "actual_length": 783 }
//! }
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for digit-gauss operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Wrong sample length or out-of-range pixel.
    SampleValidation,
    /// Label outside 0-9.
    LabelOutOfRange,
    /// An operation ran before the model it needs was fitted.
    ModelNotInitialized,
    /// Caller supplied an unusable parameter or an empty table.
    InvalidArgument,
    /// The engine could not complete a numerical computation.
    InternalComputation,
    /// Training data could not be parsed.
    Dataset,
    /// Configuration file or value errors.
    Config,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::SampleValidation => write!(f, "sample_validation"),
            ErrorCategory::LabelOutOfRange => write!(f, "label_out_of_range"),
            ErrorCategory::ModelNotInitialized => write!(f, "model_not_initialized"),
            ErrorCategory::InvalidArgument => write!(f, "invalid_argument"),
            ErrorCategory::InternalComputation => write!(f, "internal_computation"),
            ErrorCategory::Dataset => write!(f, "dataset"),
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// The cached models held by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Per-class prior, mean and covariance.
    ClassStatistics,
    /// Projection + mixture model of the clustering evaluator.
    ClusterModel,
    /// Per-label projection + mixture generators.
    LabelMixtures,
}

impl ModelKind {
    /// Operation that populates this model.
    pub fn init_operation(&self) -> &'static str {
        match self {
            ModelKind::ClassStatistics => "estimate",
            ModelKind::ClusterModel => "fit_clusters",
            ModelKind::LabelMixtures => "fit_label_mixtures",
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelKind::ClassStatistics => write!(f, "class statistics"),
            ModelKind::ClusterModel => write!(f, "cluster model"),
            ModelKind::LabelMixtures => write!(f, "label mixtures"),
        }
    }
}

/// Suggested actions for callers to take in response to errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    /// Correct the sample and resubmit.
    FixSample,
    /// Use a label in 0-9.
    FixLabel,
    /// Run the initialization operation for the model first.
    Initialize,
    /// Correct the call parameters.
    FixArguments,
    /// Repair the training data file.
    FixDataset,
    /// Validate configuration.
    RunCheck,
    /// Retry the operation (I/O may be transient).
    Retry,
    /// Report as a bug; the input was valid.
    Report,
}

impl std::fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuggestedAction::FixSample => write!(f, "fix_sample"),
            SuggestedAction::FixLabel => write!(f, "fix_label"),
            SuggestedAction::Initialize => write!(f, "initialize"),
            SuggestedAction::FixArguments => write!(f, "fix_arguments"),
            SuggestedAction::FixDataset => write!(f, "fix_dataset"),
            SuggestedAction::RunCheck => write!(f, "run_check"),
            SuggestedAction::Retry => write!(f, "retry"),
            SuggestedAction::Report => write!(f, "report"),
        }
    }
}

/// Unified error type for digit-gauss.
#[derive(Error, Debug)]
pub enum Error {
    // Sample validation (10-19)
    #[error("sample length must be 784 ({actual} given)")]
    SampleLength { actual: usize },

    #[error("every sample pixel value must be between 0-255 (inclusive), pixel {index} is {value}")]
    PixelOutOfRange { index: usize, value: i64 },

    // Label validation (20-29)
    #[error("label has to be a number between 0 and 9, not {label}")]
    LabelOutOfRange { label: i64 },

    // Model lifecycle (30-39)
    #[error("{model} not initialized; run `{op}` first", op = .model.init_operation())]
    ModelNotInitialized { model: ModelKind },

    // Caller arguments (40-49)
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter { name: &'static str, message: String },

    #[error("training table is empty")]
    EmptyTrainingTable,

    // Computation (50-59)
    #[error("internal computation failed: {0}")]
    InternalComputation(String),

    // Data and I/O (60-69)
    #[error("training data line {line}: {message}")]
    Dataset { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration (70-79)
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Sample validation
    /// - 20-29: Label validation
    /// - 30-39: Model lifecycle
    /// - 40-49: Caller arguments
    /// - 50-59: Computation
    /// - 60-69: Data and I/O
    /// - 70-79: Configuration
    pub fn code(&self) -> u32 {
        match self {
            Error::SampleLength { .. } => 10,
            Error::PixelOutOfRange { .. } => 11,
            Error::LabelOutOfRange { .. } => 20,
            Error::ModelNotInitialized { .. } => 30,
            Error::InvalidParameter { .. } => 40,
            Error::EmptyTrainingTable => 41,
            Error::InternalComputation(_) => 50,
            Error::Dataset { .. } => 60,
            Error::Io(_) => 61,
            Error::Json(_) => 62,
            Error::Config(_) => 70,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::SampleLength { .. } | Error::PixelOutOfRange { .. } => {
                ErrorCategory::SampleValidation
            }
            Error::LabelOutOfRange { .. } => ErrorCategory::LabelOutOfRange,
            Error::ModelNotInitialized { .. } => ErrorCategory::ModelNotInitialized,
            Error::InvalidParameter { .. } | Error::EmptyTrainingTable => {
                ErrorCategory::InvalidArgument
            }
            Error::InternalComputation(_) => ErrorCategory::InternalComputation,
            Error::Dataset { .. } => ErrorCategory::Dataset,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
            Error::Config(_) => ErrorCategory::Config,
        }
    }

    /// Returns whether the caller can fix the condition and re-issue the call.
    ///
    /// Every failure except an internal computation error is caused by the
    /// call's inputs or the engine's lifecycle state.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::InternalComputation(_))
    }

    /// Returns the suggested action for callers.
    pub fn suggested_action(&self) -> SuggestedAction {
        match self {
            Error::SampleLength { .. } | Error::PixelOutOfRange { .. } => {
                SuggestedAction::FixSample
            }
            Error::LabelOutOfRange { .. } => SuggestedAction::FixLabel,
            Error::ModelNotInitialized { .. } => SuggestedAction::Initialize,
            Error::InvalidParameter { .. } | Error::EmptyTrainingTable => {
                SuggestedAction::FixArguments
            }
            Error::InternalComputation(_) => SuggestedAction::Report,
            Error::Dataset { .. } => SuggestedAction::FixDataset,
            Error::Io(_) => SuggestedAction::Retry,
            Error::Json(_) => SuggestedAction::FixArguments,
            Error::Config(_) => SuggestedAction::RunCheck,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::SampleLength { .. } | Error::PixelOutOfRange { .. } => {
                "Send exactly 784 pixel values (a flattened 28x28 image), each in 0-255."
            }
            Error::LabelOutOfRange { .. } => "Use a digit label between 0 and 9.",
            Error::ModelNotInitialized { .. } => {
                "Fit the model from a training table before classifying, sampling or evaluating."
            }
            Error::InvalidParameter { .. } => {
                "Check component counts and dimensions against the size of the training table."
            }
            Error::EmptyTrainingTable => "Provide at least one labeled training row.",
            Error::InternalComputation(_) => {
                "The inputs were valid but the numerical routine failed. Report with the training data fingerprint."
            }
            Error::Dataset { .. } => {
                "Each training row must be a label followed by 784 pixel values, comma separated."
            }
            Error::Io(_) => "Check that the file exists and is readable, then retry.",
            Error::Json(_) => "Check the JSON syntax of the input.",
            Error::Config(_) => "Run 'dg-core config show' to inspect the resolved configuration.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::SampleLength { .. } | Error::PixelOutOfRange { .. } => "Invalid Sample",
            Error::LabelOutOfRange { .. } => "Label Out of Range",
            Error::ModelNotInitialized { .. } => "Model Not Initialized",
            Error::InvalidParameter { .. } => "Invalid Parameter",
            Error::EmptyTrainingTable => "Empty Training Table",
            Error::InternalComputation(_) => "Internal Computation Error",
            Error::Dataset { .. } => "Invalid Training Data",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
            Error::Config(_) => "Configuration Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ErrorReport {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the caller can fix the condition.
    pub recoverable: bool,

    /// Suggested action for callers.
    pub suggested_action: SuggestedAction,

    /// Additional structured context (e.g., offending label, line number).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for ErrorReport {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::SampleLength { actual } => {
                context.insert("actual_length".to_string(), serde_json::json!(actual));
            }
            Error::PixelOutOfRange { index, value } => {
                context.insert("pixel_index".to_string(), serde_json::json!(index));
                context.insert("pixel_value".to_string(), serde_json::json!(value));
            }
            Error::LabelOutOfRange { label } => {
                context.insert("label".to_string(), serde_json::json!(label));
            }
            Error::ModelNotInitialized { model } => {
                context.insert("model".to_string(), serde_json::json!(model));
            }
            Error::Dataset { line, .. } => {
                context.insert("line".to_string(), serde_json::json!(line));
            }
            _ => {}
        }

        ErrorReport {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action(),
            context,
        }
    }
}

impl ErrorReport {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

/// Format an error for human-readable stderr output.
///
/// Output format:
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
///   Fix: [Remediation hint]
/// ```
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}
