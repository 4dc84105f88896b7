//! Elasticsearch bulk (NDJSON) payloads
//!
//! Two lines per document:
//!
//! ```text
//! {"index":{"_index":"metrics.counter","_type":"counter","_id":"<uuid>"}}
//! {"name":"hits","fields":{"value":5},"tags":{"env":"prod"},"@timestamp":"..."}
//! ```

use chrono::SecondsFormat;
use metricsink_domain::{Fields, MetricDocument, MetricSinkError, MetricTags};
use serde::Serialize;
use uuid::Uuid;

use super::{DocumentBatch, PayloadBuilder, PayloadError};

#[derive(Serialize)]
struct BulkAction<'a> {
    index: BulkIndexMeta<'a>,
}

#[derive(Serialize)]
struct BulkIndexMeta<'a> {
    #[serde(rename = "_index")]
    index: String,
    #[serde(rename = "_type")]
    kind: &'a str,
    #[serde(rename = "_id")]
    id: String,
}

#[derive(Serialize)]
struct BulkSource<'a> {
    name: &'a str,
    fields: &'a Fields,
    tags: Option<&'a MetricTags>,
    #[serde(rename = "@timestamp")]
    timestamp: String,
}

/// Builds `_bulk` request bodies for one index prefix
#[derive(Debug)]
pub struct BulkPayloadBuilder {
    index: String,
    batch: DocumentBatch,
}

impl BulkPayloadBuilder {
    /// Documents are routed to `<index>.<kind>`
    pub fn new(index: impl Into<String>) -> metricsink_domain::Result<Self> {
        let index = index.into();
        if index.trim().is_empty() {
            return Err(MetricSinkError::Config("elasticsearch index is required".into()));
        }
        Ok(Self { index, batch: DocumentBatch::new() })
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    fn write_document(&self, out: &mut String, document: &MetricDocument) -> Result<(), PayloadError> {
        let action = BulkAction {
            index: BulkIndexMeta {
                index: format!("{}.{}", self.index, document.kind),
                kind: &document.kind,
                id: Uuid::new_v4().to_string(),
            },
        };
        let source = BulkSource {
            name: &document.name,
            fields: &document.fields,
            tags: (!document.tags.is_empty()).then_some(&document.tags),
            timestamp: document.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        };

        push_line(out, &action)?;
        push_line(out, &source)
    }
}

fn push_line<T: Serialize>(out: &mut String, value: &T) -> Result<(), PayloadError> {
    let line =
        serde_json::to_string(value).map_err(|err| PayloadError::Serialization(err.to_string()))?;
    out.push_str(&line);
    out.push('\n');
    Ok(())
}

impl PayloadBuilder for BulkPayloadBuilder {
    fn format(&self) -> &'static str {
        "elasticsearch-bulk"
    }

    fn batch(&self) -> &DocumentBatch {
        &self.batch
    }

    fn batch_mut(&mut self) -> &mut DocumentBatch {
        &mut self.batch
    }

    fn render(&self, documents: &[MetricDocument]) -> Result<String, PayloadError> {
        let mut out = String::with_capacity(documents.len() * 256);
        for document in documents {
            self.write_document(&mut out, document)?;
        }
        Ok(out)
    }
}
