//! digit-gauss common types and errors.
//!
//! This crate provides foundational types shared across the dg-* crates:
//! - Validated samples (784 pixel intensities) and labels (digits 0-9)
//! - A fixed-size table keyed by label
//! - The labeled training table handed to the engine
//! - The unified error type with stable codes

pub mod error;
pub mod label;
pub mod sample;
pub mod table;

pub use error::{format_error_human, Error, ErrorCategory, ErrorReport, ModelKind, Result, SuggestedAction};
pub use label::{Label, LabelTable, NUM_LABELS};
pub use sample::{Sample, IMAGE_SIDE, PIXEL_MAX, SAMPLE_LEN};
pub use table::TrainingTable;
