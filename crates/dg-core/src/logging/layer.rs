//! JSONL tracing layer.
//!
//! Every event becomes one [`LogEvent`] line on the writer (stderr in the
//! CLI). The `run_id`, `model_id` and `stage` fields emitted by
//! `log_event!` are lifted to the top level; all other fields land under
//! `fields`.

use std::io::{self, Write};
use std::sync::Mutex;

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use super::events::{LogEvent, Stage};

/// Correlation fields recorded on a span, inherited by events inside it.
#[derive(Debug, Clone, Default)]
struct Correlation {
    run_id: Option<String>,
    model_id: Option<String>,
    stage: Option<Stage>,
}

impl Correlation {
    /// Returns false for keys that are not correlation fields.
    fn accept(&mut self, key: &str, value: &str) -> bool {
        let slot = match key {
            "run_id" => &mut self.run_id,
            "model_id" => &mut self.model_id,
            "stage" => {
                if self.stage.is_none() {
                    self.stage = value.parse().ok();
                }
                return true;
            }
            _ => return false,
        };
        if slot.is_none() && !value.is_empty() {
            *slot = Some(value.to_string());
        }
        true
    }

    fn apply_missing(&self, record: &mut LogEvent) {
        if record.run_id.is_none() {
            record.run_id.clone_from(&self.run_id);
        }
        if record.model_id.is_none() {
            record.model_id.clone_from(&self.model_id);
        }
        if record.stage.is_none() {
            record.stage = self.stage;
        }
    }
}

impl Visit for Correlation {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.accept(field.name(), value);
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.accept(field.name(), &format!("{value:?}"));
    }
}

/// Fills a [`LogEvent`] from one tracing event.
struct RecordVisitor<'a> {
    record: &'a mut LogEvent,
    correlation: Correlation,
}

impl RecordVisitor<'_> {
    fn text(&mut self, name: &str, value: String) {
        if name == "message" {
            self.record.message = value;
        } else if !self.correlation.accept(name, &value) {
            self.record
                .fields
                .insert(name.to_string(), serde_json::Value::String(value));
        }
    }

    fn value(&mut self, name: &str, value: serde_json::Value) {
        self.record.fields.insert(name.to_string(), value);
    }
}

impl Visit for RecordVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.text(field.name(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.text(field.name(), format!("{value:?}"));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.value(field.name(), value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.value(field.name(), value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        // NaN and infinities are written as strings.
        let v = serde_json::Number::from_f64(value)
            .map(serde_json::Value::Number)
            .unwrap_or_else(|| serde_json::Value::String(value.to_string()));
        self.value(field.name(), v);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.value(field.name(), value.into());
    }
}

/// Writes one JSON object per event.
pub struct JsonlLayer<W = io::Stderr> {
    writer: Mutex<W>,
}

impl JsonlLayer<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> JsonlLayer<W> {
    pub fn new(writer: W) -> Self {
        JsonlLayer {
            writer: Mutex::new(writer),
        }
    }
}

impl<S, W> Layer<S> for JsonlLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: Write + 'static,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut correlation = Correlation::default();
        attrs.record(&mut correlation);
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(correlation);
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut record = LogEvent::new((*metadata.level()).into(), metadata.target());

        let mut visitor = RecordVisitor {
            record: &mut record,
            correlation: Correlation::default(),
        };
        event.record(&mut visitor);
        let own = visitor.correlation;
        own.apply_missing(&mut record);

        // Innermost span first; event fields already set win.
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope {
                if let Some(inherited) = span.extensions().get::<Correlation>() {
                    inherited.apply_missing(&mut record);
                }
            }
        }

        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", record.to_jsonl());
        }
    }
}
