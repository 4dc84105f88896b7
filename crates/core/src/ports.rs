//! Port interfaces between report orchestration and its collaborators
//!
//! - [`MetricsSource`]: snapshot provider owned by the host metrics library
//! - [`HealthSource`]: health check evaluation for alerters
//! - [`BulkWriter`]: sink that accepts one serialized batch per call
//! - [`ReportTask`]: anything a scheduler can tick

use async_trait::async_trait;
use metricsink_domain::{HealthReport, MetricsSnapshot, Result};
use tokio_util::sync::CancellationToken;

/// Outcome of a single batch write
///
/// Writers never return `Err`: every transport, status or breaker refusal is
/// folded into a failed result so the report loop keeps running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResult {
    pub success: bool,
    pub error_message: Option<String>,
}

impl WriteResult {
    pub const fn ok() -> Self {
        Self { success: true, error_message: None }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, error_message: Some(message.into()) }
    }

    /// Error message, or an empty string on success
    pub fn message(&self) -> &str {
        self.error_message.as_deref().unwrap_or_default()
    }
}

/// Read-only view of the host application's metrics
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Take a snapshot of every registered metric
    async fn snapshot(&self) -> Result<MetricsSnapshot>;
}

/// Health check evaluation
#[async_trait]
pub trait HealthSource: Send + Sync {
    async fn evaluate(&self) -> Result<HealthReport>;
}

/// Sink for serialized batches
#[async_trait]
pub trait BulkWriter: Send + Sync {
    /// Target name used in log fields and error messages
    fn target(&self) -> &str;

    /// Write one serialized batch
    ///
    /// A blank payload must succeed without side effects. Cancellation must
    /// unblock the write promptly and surface as a failed result.
    async fn write(&self, payload: &str, cancel: &CancellationToken) -> WriteResult;
}

/// A periodic reporting job
#[async_trait]
pub trait ReportTask: Send + Sync {
    fn name(&self) -> &str;

    /// Run one cycle; `true` when the cycle flushed successfully
    async fn run_once(&self, cancel: &CancellationToken) -> bool;
}
