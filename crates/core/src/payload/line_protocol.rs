//! InfluxDB line protocol payloads
//!
//! `measurement[,tag=value...] field=value[,field=value...] <timestamp-ns>`

use std::fmt::Write as _;

use metricsink_domain::constants::MEASUREMENT_TYPE_TAG;
use metricsink_domain::{FieldValue, MetricDocument};

use super::{DocumentBatch, PayloadBuilder, PayloadError};

/// Builds newline-separated line protocol points
///
/// The document name is the measurement. Its kind travels as the `mtype` tag
/// unless the source already supplied one.
#[derive(Debug, Default)]
pub struct LineProtocolPayloadBuilder {
    batch: DocumentBatch,
}

impl LineProtocolPayloadBuilder {
    pub fn new() -> Self {
        Self::default()
    }
}

fn escape_measurement(value: &str) -> String {
    escape(value, &[',', ' '])
}

fn escape_key(value: &str) -> String {
    escape(value, &[',', '=', ' '])
}

fn escape(value: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if special.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn write_field_value(out: &mut String, value: &FieldValue) {
    // Writing into a String cannot fail
    let _ = match value {
        FieldValue::Int(v) => write!(out, "{v}i"),
        FieldValue::UInt(v) => write!(out, "{v}i"),
        FieldValue::Float(v) => write!(out, "{v}"),
        FieldValue::Bool(v) => write!(out, "{v}"),
        FieldValue::Str(v) => {
            out.push('"');
            for ch in v.chars() {
                if ch == '"' || ch == '\\' {
                    out.push('\\');
                }
                out.push(ch);
            }
            out.push('"');
            Ok(())
        }
    };
}

fn write_point(out: &mut String, document: &MetricDocument) -> Result<(), PayloadError> {
    out.push_str(&escape_measurement(&document.name));

    if document.tags.get(MEASUREMENT_TYPE_TAG).is_none() {
        out.push(',');
        out.push_str(MEASUREMENT_TYPE_TAG);
        out.push('=');
        out.push_str(&escape_key(&document.kind));
    }
    for (key, value) in document.tags.iter() {
        if value.is_empty() {
            continue;
        }
        out.push(',');
        out.push_str(&escape_key(key));
        out.push('=');
        out.push_str(&escape_key(value));
    }

    for (index, (key, value)) in document.fields.iter().enumerate() {
        out.push(if index == 0 { ' ' } else { ',' });
        out.push_str(&escape_key(key));
        out.push('=');
        write_field_value(out, value);
    }

    let nanos = document.timestamp.timestamp_nanos_opt().ok_or_else(|| {
        PayloadError::Serialization(format!(
            "timestamp {} of '{}' is out of range",
            document.timestamp, document.name
        ))
    })?;
    let _ = write!(out, " {nanos}");
    Ok(())
}

impl PayloadBuilder for LineProtocolPayloadBuilder {
    fn format(&self) -> &'static str {
        "influxdb-line-protocol"
    }

    fn batch(&self) -> &DocumentBatch {
        &self.batch
    }

    fn batch_mut(&mut self) -> &mut DocumentBatch {
        &mut self.batch
    }

    fn render(&self, documents: &[MetricDocument]) -> Result<String, PayloadError> {
        let mut lines = Vec::with_capacity(documents.len());
        for document in documents {
            // A point without fields is rejected by the server
            if document.fields.is_empty() {
                continue;
            }
            let mut line = String::new();
            write_point(&mut line, document)?;
            lines.push(line);
        }
        Ok(lines.join("\n"))
    }
}
