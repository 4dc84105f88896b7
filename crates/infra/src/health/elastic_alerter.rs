//! Health status alerts indexed into Elasticsearch
//!
//! Each run evaluates the health source and writes only what changed:
//!
//! 1. unhealthy checks not yet alerted
//! 2. checks still unhealthy once `runs_before_report_existing_failures` runs
//!    have passed since the last re-alert
//! 3. the same two rules for degraded checks when `alert_on_degraded_checks`
//! 4. previously alerted checks that are healthy again
//!
//! Alerts and recoveries go out as two separate bulk requests. The caches are
//! updated when a check is selected, not when the write succeeds.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use metricsink_core::config::HealthAlertSettings;
use metricsink_core::ports::{BulkWriter, HealthSource, ReportTask};
use metricsink_domain::{HealthCheckResult, HealthReport, HealthStatus, MetricSinkError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use crate::errors::InfraError;
use crate::sinks::BulkWriteClient;

/// Runs of characters not allowed in a health document id
const SANITIZE_PATTERN: &str = "[^a-zA-Z0-9-]+";

#[allow(clippy::expect_used)]
static SANITIZE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(SANITIZE_PATTERN).expect("SANITIZE_REGEX should compile - this is a bug")
});

/// Health alerter errors
#[derive(Debug, Error)]
pub enum HealthAlertError {
    #[error("health evaluation failed: {0}")]
    Evaluation(#[source] MetricSinkError),

    #[error("failed to encode health document: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("health alert write failed: {0}")]
    Write(String),
}

impl From<HealthAlertError> for InfraError {
    fn from(err: HealthAlertError) -> Self {
        let sink_err = match err {
            HealthAlertError::Evaluation(inner) => inner,
            HealthAlertError::Encoding(inner) => MetricSinkError::Serialization(inner.to_string()),
            HealthAlertError::Write(message) => MetricSinkError::Network(message),
        };
        InfraError(sink_err)
    }
}

impl From<HealthAlertError> for MetricSinkError {
    fn from(err: HealthAlertError) -> Self {
        InfraError::from(err).into()
    }
}

/// Lowercase and replace anything outside `[a-zA-Z0-9-]` with `_`
fn sanitize(value: &str) -> String {
    SANITIZE_REGEX.replace_all(value, "_").to_lowercase()
}

/// Document id for a check: `<application>-<check>`, both parts sanitized
pub fn health_document_id(application: &str, check: &str) -> String {
    format!("{}-{}", sanitize(application), sanitize(check))
}

/// One indexed health check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheckDocument {
    #[serde(skip)]
    pub id: String,
    pub application: String,
    pub check: String,
    pub status: String,
    pub message: Option<String>,
}

impl HealthCheckDocument {
    fn new(application: &str, result: &HealthCheckResult) -> Self {
        Self {
            id: health_document_id(application, &result.name),
            application: application.to_string(),
            check: result.name.clone(),
            status: status_label(result.status).to_string(),
            message: result.message.clone(),
        }
    }
}

const fn status_label(status: HealthStatus) -> &'static str {
    match status {
        HealthStatus::Healthy => "Healthy",
        HealthStatus::Degraded => "Degraded",
        HealthStatus::Unhealthy => "Unhealthy",
    }
}

#[derive(Serialize)]
struct IndexAction<'a> {
    index: IndexMeta<'a>,
}

#[derive(Serialize)]
struct IndexMeta<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_id")]
    id: &'a str,
}

/// Render documents as an Elasticsearch bulk body
pub fn render_bulk(index: &str, documents: &[HealthCheckDocument]) -> Result<String, HealthAlertError> {
    let mut payload = String::new();
    for document in documents {
        let action = IndexAction { index: IndexMeta { index, id: &document.id } };
        payload.push_str(&serde_json::to_string(&action)?);
        payload.push('\n');
        payload.push_str(&serde_json::to_string(document)?);
        payload.push('\n');
    }
    Ok(payload)
}

#[derive(Debug, Default)]
struct AlertState {
    unhealthy: HashSet<String>,
    degraded: HashSet<String>,
    runs: u32,
}

impl AlertState {
    fn mark(&mut self, result: &HealthCheckResult) {
        match result.status {
            HealthStatus::Unhealthy => {
                self.degraded.remove(&result.name);
                self.unhealthy.insert(result.name.clone());
            }
            HealthStatus::Degraded => {
                self.unhealthy.remove(&result.name);
                self.degraded.insert(result.name.clone());
            }
            HealthStatus::Healthy => {}
        }
    }
}

/// Documents selected for one run
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AlertPlan {
    pub alerts: Vec<HealthCheckDocument>,
    pub recovered: Vec<HealthCheckDocument>,
}

impl AlertPlan {
    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty() && self.recovered.is_empty()
    }
}

/// Writes health check state changes to an Elasticsearch index
pub struct ElasticHealthAlerter {
    settings: HealthAlertSettings,
    source: Arc<dyn HealthSource>,
    writer: Arc<dyn BulkWriter>,
    state: Mutex<AlertState>,
}

impl ElasticHealthAlerter {
    pub fn new(
        settings: HealthAlertSettings,
        source: Arc<dyn HealthSource>,
        writer: Arc<dyn BulkWriter>,
    ) -> Self {
        Self { settings, source, writer, state: Mutex::new(AlertState::default()) }
    }

    /// Alerter with its own bulk client built from `settings`
    pub fn from_settings(
        settings: HealthAlertSettings,
        source: Arc<dyn HealthSource>,
    ) -> metricsink_domain::Result<Self> {
        settings.validate()?;
        let client = BulkWriteClient::new(
            crate::sinks::ElasticsearchEndpoint,
            &settings.base_uri,
            settings.auth.resolve()?,
            &settings.http_policy,
        )?;
        Ok(Self::new(settings, source, Arc::new(client)))
    }

    pub fn settings(&self) -> &HealthAlertSettings {
        &self.settings
    }

    fn state(&self) -> MutexGuard<'_, AlertState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("health alert state mutex poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Select alerts and recoveries for `report`, updating the caches
    pub fn plan(&self, report: &HealthReport) -> AlertPlan {
        let mut state = self.state();
        state.runs = state.runs.saturating_add(1);
        let report_existing = state.runs > self.settings.runs_before_report_existing_failures;

        let mut statuses = vec![HealthStatus::Unhealthy];
        if self.settings.alert_on_degraded_checks {
            statuses.push(HealthStatus::Degraded);
        }

        let mut selected: Vec<&HealthCheckResult> = Vec::new();
        for status in statuses {
            let cache = match status {
                HealthStatus::Unhealthy => &state.unhealthy,
                _ => &state.degraded,
            };
            let (new, existing): (Vec<_>, Vec<_>) =
                report.with_status(status).partition(|result| !cache.contains(&result.name));
            selected.extend(new);
            if report_existing {
                selected.extend(existing);
            }
        }

        if report_existing {
            state.runs = 0;
        }

        let application = self.settings.application_name.as_str();
        let mut plan = AlertPlan::default();
        for result in selected {
            state.mark(result);
            plan.alerts.push(HealthCheckDocument::new(application, result));
        }

        for result in report.with_status(HealthStatus::Healthy) {
            let was_unhealthy = state.unhealthy.remove(&result.name);
            let was_degraded = state.degraded.remove(&result.name);
            if was_unhealthy || was_degraded {
                plan.recovered.push(HealthCheckDocument::new(application, result));
            }
        }

        plan
    }

    /// Evaluate health and write any alerts; returns documents written
    pub async fn report(&self, cancel: &CancellationToken) -> Result<usize, HealthAlertError> {
        if !self.settings.enabled {
            trace!("health alerter disabled, not reporting");
            return Ok(0);
        }

        let report = self.source.evaluate().await.map_err(HealthAlertError::Evaluation)?;
        let plan = self.plan(&report);
        if plan.is_empty() {
            trace!("no health status changes to report");
            return Ok(0);
        }

        let mut written = 0;
        let mut failure = None;
        for (kind, documents) in [("alerts", &plan.alerts), ("recoveries", &plan.recovered)] {
            if documents.is_empty() {
                continue;
            }
            let payload = render_bulk(&self.settings.index, documents)?;
            let result = self.writer.write(&payload, cancel).await;
            if result.success {
                debug!(kind, documents = documents.len(), "reported health status");
                written += documents.len();
            } else {
                error!(kind, reason = result.message(), "failed to report health status");
                failure.get_or_insert_with(|| result.message().to_string());
            }
        }

        match failure {
            Some(message) => Err(HealthAlertError::Write(message)),
            None => Ok(written),
        }
    }
}

#[async_trait]
impl ReportTask for ElasticHealthAlerter {
    fn name(&self) -> &str {
        "elasticsearch-health"
    }

    async fn run_once(&self, cancel: &CancellationToken) -> bool {
        match self.report(cancel).await {
            Ok(_) => true,
            Err(err) => {
                warn!(error = %err, "health alert run failed");
                false
            }
        }
    }
}
