//! Human-readable payloads for the console and text-file sinks

use std::fmt::Write as _;

use chrono::SecondsFormat;
use metricsink_domain::{FieldValue, MetricDocument};

use super::{DocumentBatch, PayloadBuilder, PayloadError};

const SEPARATOR: &str = "--------------------------------------------------------------";
const PAD: usize = 20;

/// Renders one block per document
///
/// ```text
/// # TIMESTAMP: 2024-03-01T12:30:00Z
/// # MEASUREMENT: [counter] hits
/// # TAGS:
///                  env = prod
/// # FIELDS:
///                value = 5
/// --------------------------------------------------------------
/// ```
#[derive(Debug, Default)]
pub struct PlainTextPayloadBuilder {
    batch: DocumentBatch,
}

impl PlainTextPayloadBuilder {
    pub fn new() -> Self {
        Self::default()
    }
}

fn render_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Int(v) => v.to_string(),
        FieldValue::UInt(v) => v.to_string(),
        FieldValue::Float(v) => format!("{v:.2}"),
        FieldValue::Bool(v) => v.to_string(),
        FieldValue::Str(v) => v.clone(),
    }
}

impl PayloadBuilder for PlainTextPayloadBuilder {
    fn format(&self) -> &'static str {
        "plain-text"
    }

    fn batch(&self) -> &DocumentBatch {
        &self.batch
    }

    fn batch_mut(&mut self) -> &mut DocumentBatch {
        &mut self.batch
    }

    fn render(&self, documents: &[MetricDocument]) -> Result<String, PayloadError> {
        let mut out = String::new();
        for document in documents {
            let _ = writeln!(
                out,
                "# TIMESTAMP: {}",
                document.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
            );
            let _ = writeln!(out, "# MEASUREMENT: [{}] {}", document.kind, document.name);

            if !document.tags.is_empty() {
                out.push_str("# TAGS:\n");
                for (key, value) in document.tags.iter() {
                    let _ = writeln!(out, "{key:>PAD$} = {value}");
                }
            }

            out.push_str("# FIELDS:\n");
            for (key, value) in document.fields.iter() {
                let _ = writeln!(out, "{key:>PAD$} = {}", render_value(value));
            }
            out.push_str(SEPARATOR);
            out.push('\n');
        }
        Ok(out)
    }
}
