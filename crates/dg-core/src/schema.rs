//! JSON Schema generation for CLI inputs and outputs.
//!
//! ```bash
//! dg-core schema --list
//! dg-core schema ClusterEvaluation
//! dg-core schema --all
//! ```

use schemars::schema_for;
use serde_json::Value;
use std::collections::BTreeMap;

pub use crate::cluster::ClusterEvaluation;
pub use crate::decision::Decision;
pub use crate::engine::{
    ClassSummary, Classification, ClusterSummary, EngineStatus, GeneratorSummary, ModelSummary,
    SlotState,
};
pub use crate::inference::{ClassEvidence, LabelProbability, PosteriorResult, PosteriorVector};
pub use dg_common::{ErrorReport, Label, Sample};
pub use dg_config::{EngineConfig, MixtureConfig};

/// Available schema types with their descriptions.
pub fn available_schemas() -> Vec<(&'static str, &'static str)> {
    vec![
        // Inputs
        ("Sample", "784 pixel intensities in 0-255, row-major 28x28"),
        ("Label", "Digit class 0-9"),
        ("EngineConfig", "Engine configuration file (engine.json)"),
        ("MixtureConfig", "Expectation-maximization settings"),
        // Classification
        ("ClassEvidence", "Log-likelihood and log-prior of one class"),
        ("LabelProbability", "Posterior probability of one label"),
        ("PosteriorVector", "Normalized posterior over observed labels"),
        ("PosteriorResult", "Posterior with per-class evidence"),
        ("Decision", "Chosen label and its probability"),
        ("Classification", "Decision together with its posterior"),
        // Models
        ("ClassSummary", "Fitted statistics of one class"),
        ("ModelSummary", "Summary of estimated class statistics"),
        ("ClusterSummary", "Summary of a fitted cluster model"),
        ("GeneratorSummary", "Summary of one per-label generator"),
        ("ClusterEvaluation", "Cluster assignments scored against labels"),
        ("SlotState", "Lifecycle state of a cached model"),
        ("EngineStatus", "Lifecycle state of every cached model"),
        // Errors
        ("ErrorReport", "Machine-readable error on stderr"),
    ]
}

/// Generate JSON Schema for a type by name.
///
/// Returns None if the type is unknown.
pub fn generate_schema(type_name: &str) -> Option<Value> {
    let schema = match type_name {
        "Sample" => schema_for!(Sample),
        "Label" => schema_for!(Label),
        "EngineConfig" => schema_for!(EngineConfig),
        "MixtureConfig" => schema_for!(MixtureConfig),
        "ClassEvidence" => schema_for!(ClassEvidence),
        "LabelProbability" => schema_for!(LabelProbability),
        "PosteriorVector" => schema_for!(PosteriorVector),
        "PosteriorResult" => schema_for!(PosteriorResult),
        "Decision" => schema_for!(Decision),
        "Classification" => schema_for!(Classification),
        "ClassSummary" => schema_for!(ClassSummary),
        "ModelSummary" => schema_for!(ModelSummary),
        "ClusterSummary" => schema_for!(ClusterSummary),
        "GeneratorSummary" => schema_for!(GeneratorSummary),
        "ClusterEvaluation" => schema_for!(ClusterEvaluation),
        "SlotState" => schema_for!(SlotState),
        "EngineStatus" => schema_for!(EngineStatus),
        "ErrorReport" => schema_for!(ErrorReport),
        _ => return None,
    };

    serde_json::to_value(schema).ok()
}

/// Generate all schemas as a map from type name to schema.
pub fn generate_all_schemas() -> BTreeMap<String, Value> {
    let mut schemas = BTreeMap::new();
    for (name, _desc) in available_schemas() {
        if let Some(schema) = generate_schema(name) {
            schemas.insert(name.to_string(), schema);
        }
    }
    schemas
}
