//! Health check results consumed by health alerters

use serde::{Deserialize, Serialize};

/// Outcome of a single health check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl_label_conversions!(HealthStatus {
    Healthy => "healthy",
    Degraded => "degraded",
    Unhealthy => "unhealthy",
});

/// A named health check result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub name: String,
    pub status: HealthStatus,
    #[serde(default)]
    pub message: Option<String>,
}

impl HealthCheckResult {
    pub fn new(name: impl Into<String>, status: HealthStatus) -> Self {
        Self { name: name.into(), status, message: None }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// All check results from one health evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub results: Vec<HealthCheckResult>,
}

impl HealthReport {
    pub fn new(results: Vec<HealthCheckResult>) -> Self {
        Self { results }
    }

    pub fn with_status(&self, status: HealthStatus) -> impl Iterator<Item = &HealthCheckResult> {
        self.results.iter().filter(move |result| result.status == status)
    }
}
