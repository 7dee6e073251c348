//! Structured event definitions for logging.
//!
//! Every engine event carries the invocation's `run_id` and the pipeline
//! stage it belongs to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Log levels for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Pipeline stages of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and configuration.
    Init,
    /// Reading the training table.
    Load,
    /// Per-class parameter estimation.
    Estimate,
    /// Likelihood, posterior and decision.
    Classify,
    /// Generative sampling.
    Sample,
    /// Principal-axis projection.
    Project,
    /// Mixture fitting and assignment.
    Cluster,
    /// Scoring clusters against ground truth.
    Evaluate,
}

const STAGES: [Stage; 8] = [
    Stage::Init,
    Stage::Load,
    Stage::Estimate,
    Stage::Classify,
    Stage::Sample,
    Stage::Project,
    Stage::Cluster,
    Stage::Evaluate,
];

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::Load => "load",
            Stage::Estimate => "estimate",
            Stage::Classify => "classify",
            Stage::Sample => "sample",
            Stage::Project => "project",
            Stage::Cluster => "cluster",
            Stage::Evaluate => "evaluate",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        STAGES
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| format!("unknown stage {s:?}"))
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    // Config/load
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const DATASET_LOADED: &str = "dataset.loaded";

    // Model lifecycle
    pub const MODEL_INITIALIZING: &str = "model.initializing";
    pub const MODEL_ESTIMATED: &str = "model.estimated";
    pub const MODEL_READY: &str = "model.ready";
    pub const MODEL_FAILED: &str = "model.failed";
    pub const MODEL_SUPERSEDED: &str = "model.superseded";
    pub const MODEL_TORN_DOWN: &str = "model.torn_down";
    pub const CLASS_DEGENERATE: &str = "model.class_degenerate";

    // Per-call results
    pub const CLASSIFY_DONE: &str = "classify.done";
    pub const SAMPLE_DONE: &str = "sample.done";
    pub const PROJECT_DONE: &str = "project.done";
    pub const CLUSTER_FITTED: &str = "cluster.fitted";
    pub const EVALUATE_DONE: &str = "evaluate.done";

    // Error events
    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// One JSONL record, as written by [`super::JsonlLayer`].
///
/// `run_id`, `model_id` and `stage` come from the event itself or, when the
/// event lacks them, from the innermost enclosing span that has them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub ts: DateTime<Utc>,
    pub level: Level,

    /// Event name, the tracing target (`model.estimated`, `classify.done`).
    pub event: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,

    /// Training-table fingerprint prefix once a model exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl LogEvent {
    pub fn new(level: Level, event: impl Into<String>) -> Self {
        LogEvent {
            ts: Utc::now(),
            level,
            event: event.into(),
            run_id: None,
            model_id: None,
            stage: None,
            message: String::new(),
            fields: serde_json::Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.fields.insert(key.into(), v);
        }
        self
    }

    /// Serialize to a single JSON line.
    pub fn to_jsonl(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"error":"serialization_failed","event":"{}"}}"#,
                self.event
            )
        })
    }
}

/// Correlation IDs shared by every event of one invocation.
///
/// `log_event!` reads both fields; the JSONL layer lifts them to the top
/// level of each record.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub run_id: String,
    pub model_id: Option<String>,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
            model_id: None,
        }
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event_serialization() {
        let mut event = LogEvent::new(Level::Info, event_names::MODEL_ESTIMATED)
            .with_field("classes", 10);
        event.run_id = Some("run-12345".to_string());
        event.stage = Some(Stage::Estimate);
        event.message = "class statistics estimated".to_string();

        let json = event.to_jsonl();
        assert!(json.contains(r#""event":"model.estimated""#));
        assert!(json.contains(r#""level":"info""#));
        assert!(json.contains(r#""stage":"estimate""#));
        assert!(json.contains(r#""run_id":"run-12345""#));
        assert!(json.contains(r#""classes":10"#));
        assert!(!json.contains("model_id"));
    }

    #[test]
    fn test_bare_event_omits_empty_parts() {
        let json = LogEvent::new(Level::Warn, "nalgebra").to_jsonl();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 3, "{keys:?}");
    }

    #[test]
    fn test_log_context_carries_model_id() {
        let ctx = LogContext::new("run-abc").with_model_id("3f2a9c");
        assert_eq!(ctx.run_id, "run-abc");
        assert_eq!(ctx.model_id.as_deref(), Some("3f2a9c"));
    }

    #[test]
    fn test_stage_names_match_serde() {
        for stage in STAGES {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage));
            assert_eq!(stage.as_str().parse::<Stage>().unwrap(), stage);
        }
        assert!("training".parse::<Stage>().is_err());
    }
}
