//! Batch accumulation and wire formats
//!
//! A [`PayloadBuilder`] collects the documents of one report cycle and renders
//! them in a provider-specific format. Builders share the batch lifecycle
//! through [`DocumentBatch`] and differ only in [`PayloadBuilder::render`].
//!
//! Lifecycle per cycle: `init` → `pack`* → `serialize` → `clear`.

pub mod elasticsearch;
pub mod line_protocol;
pub mod text;

use metricsink_domain::{FieldValue, Fields, MetricDocument, MetricSinkError, MetricTags};
use thiserror::Error;
use tracing::debug;

pub use elasticsearch::BulkPayloadBuilder;
pub use line_protocol::LineProtocolPayloadBuilder;
pub use text::PlainTextPayloadBuilder;

/// Errors raised while building or rendering a batch
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("payload builder used before init() or after clear()")]
    NotInitialized,

    #[error("invalid document: {0}")]
    Validation(String),

    #[error("{columns} columns but {values} values")]
    ColumnMismatch { columns: usize, values: usize },

    #[error("failed to serialize payload: {0}")]
    Serialization(String),
}

impl From<PayloadError> for MetricSinkError {
    fn from(err: PayloadError) -> Self {
        match err {
            PayloadError::Validation(message) => Self::Validation(message),
            PayloadError::ColumnMismatch { .. } => Self::Validation(err.to_string()),
            PayloadError::Serialization(message) => Self::Serialization(message),
            PayloadError::NotInitialized => Self::Internal(err.to_string()),
        }
    }
}

/// Cycle-scoped document list
///
/// `None` between cycles so that packing outside `init`/`clear` fails fast.
#[derive(Debug, Default)]
pub struct DocumentBatch {
    documents: Option<Vec<MetricDocument>>,
}

impl DocumentBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init(&mut self) {
        self.documents = Some(Vec::new());
    }

    pub fn clear(&mut self) {
        self.documents = None;
    }

    pub fn is_active(&self) -> bool {
        self.documents.is_some()
    }

    /// Append a document without validating it
    pub fn push(&mut self, document: MetricDocument) -> Result<(), PayloadError> {
        self.documents.as_mut().ok_or(PayloadError::NotInitialized)?.push(document);
        Ok(())
    }

    /// Drop documents past `len`; used to roll back a partially packed source
    pub fn truncate(&mut self, len: usize) {
        if let Some(documents) = self.documents.as_mut() {
            documents.truncate(len);
        }
    }

    /// Documents of the active batch; empty when inactive
    pub fn documents(&self) -> &[MetricDocument] {
        self.documents.as_deref().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.documents().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents().is_empty()
    }

    /// Validate every document; the batch is never modified
    pub fn validate(&self) -> Result<(), PayloadError> {
        for document in self.documents() {
            document.validate().map_err(|err| PayloadError::Validation(err.to_string()))?;
        }
        Ok(())
    }
}

/// Accumulates documents for one cycle and renders them to a wire format
pub trait PayloadBuilder: Send {
    /// Format name used in logs
    fn format(&self) -> &'static str;

    fn batch(&self) -> &DocumentBatch;

    fn batch_mut(&mut self) -> &mut DocumentBatch;

    /// Render already validated documents
    fn render(&self, documents: &[MetricDocument]) -> Result<String, PayloadError>;

    /// Start a fresh batch, discarding anything left over
    fn init(&mut self) {
        self.batch_mut().init();
    }

    /// Append a single-field document keyed `value`
    ///
    /// Non-finite floats produce no document.
    fn pack(
        &mut self,
        kind: &str,
        name: &str,
        value: FieldValue,
        tags: &MetricTags,
    ) -> Result<(), PayloadError> {
        let mut fields = Fields::new();
        if !fields.insert(metricsink_domain::constants::VALUE_FIELD, value) {
            if !self.batch().is_active() {
                return Err(PayloadError::NotInitialized);
            }
            debug!(name, kind, "skipping non-finite value");
            return Ok(());
        }
        self.pack_fields(kind, name, fields, tags)
    }

    /// Append a multi-field document from positional columns and values
    fn pack_columns(
        &mut self,
        kind: &str,
        name: &str,
        columns: &[&str],
        values: Vec<FieldValue>,
        tags: &MetricTags,
    ) -> Result<(), PayloadError> {
        if columns.len() != values.len() {
            return Err(PayloadError::ColumnMismatch {
                columns: columns.len(),
                values: values.len(),
            });
        }

        let fields = columns.iter().copied().zip(values).collect();
        self.pack_fields(kind, name, fields, tags)
    }

    /// Append a multi-field document
    ///
    /// Blank kinds and names are rejected here, before they reach the batch.
    fn pack_fields(
        &mut self,
        kind: &str,
        name: &str,
        fields: Fields,
        tags: &MetricTags,
    ) -> Result<(), PayloadError> {
        if !self.batch().is_active() {
            return Err(PayloadError::NotInitialized);
        }

        let document = MetricDocument::new(kind, name, fields, tags.clone());
        document.validate().map_err(|err| PayloadError::Validation(err.to_string()))?;
        self.batch_mut().push(document)
    }

    /// Render the batch without mutating it
    ///
    /// Documents are re-validated so a batch assembled through
    /// [`DocumentBatch::push`] cannot emit a blank kind or name.
    fn serialize(&self) -> Result<String, PayloadError> {
        let batch = self.batch();
        batch.validate()?;
        self.render(batch.documents())
    }

    /// Drop the batch; safe to call repeatedly
    fn clear(&mut self) {
        self.batch_mut().clear();
    }

    fn document_count(&self) -> usize {
        self.batch().len()
    }
}
