//! Provider endpoints for [`BulkWriteClient`](super::BulkWriteClient)

use metricsink_core::config::InfluxDbSettings;

/// Where and how a bulk payload is posted
pub trait BulkEndpoint: Send + Sync + 'static {
    /// Name used in log fields and error messages
    fn target(&self) -> &str;

    /// Path relative to the base uri, may carry a query string
    fn path(&self) -> &str;

    fn content_type(&self) -> &'static str;
}

/// `POST {base}/_bulk` with NDJSON
#[derive(Debug, Clone, Copy, Default)]
pub struct ElasticsearchEndpoint;

impl BulkEndpoint for ElasticsearchEndpoint {
    fn target(&self) -> &str {
        "Elasticsearch"
    }

    fn path(&self) -> &str {
        "_bulk"
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }
}

/// `POST {base}/write?db=...` with line protocol
#[derive(Debug, Clone)]
pub struct InfluxDbEndpoint {
    path: String,
}

impl InfluxDbEndpoint {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_settings(settings: &InfluxDbSettings) -> Self {
        Self::new(settings.endpoint())
    }
}

impl BulkEndpoint for InfluxDbEndpoint {
    fn target(&self) -> &str {
        "InfluxDB"
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }
}
