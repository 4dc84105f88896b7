//! Reporter configuration
//!
//! Plain serde structures; loading from files and the environment lives in
//! `metricsink-infra::config`. Every section validates itself so a bad value
//! fails reporter construction instead of the first report cycle.

pub mod auth;
pub mod reporters;

use std::time::Duration;

use metricsink_common::duration_millis;
use metricsink_common::resilience::{CircuitBreakerConfig, DEFAULT_BACKOFF_PERIOD};
use metricsink_domain::{MetricSinkError, Result};
use serde::{Deserialize, Serialize};

pub use auth::{AuthScheme, AuthSettings};
pub use reporters::{
    ConsoleSettings, ElasticsearchSettings, HealthAlertSettings, InfluxDbSettings,
    TextFileSettings,
};

/// Default request timeout for outbound writes
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Circuit breaker and timeout settings for one HTTP sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpPolicy {
    pub failures_before_backoff: u64,
    #[serde(with = "duration_millis")]
    pub backoff_period: Duration,
    #[serde(with = "duration_millis")]
    pub timeout: Duration,
}

impl Default for HttpPolicy {
    fn default() -> Self {
        Self {
            failures_before_backoff: metricsink_common::resilience::DEFAULT_FAILURES_BEFORE_BACKOFF,
            backoff_period: DEFAULT_BACKOFF_PERIOD,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl HttpPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(MetricSinkError::Config("http policy timeout must be greater than 0".into()));
        }

        self.breaker_config().map(|_| ())
    }

    /// Breaker configuration derived from this policy
    pub fn breaker_config(&self) -> Result<CircuitBreakerConfig> {
        CircuitBreakerConfig::builder()
            .failure_threshold(self.failures_before_backoff)
            .backoff_period(self.backoff_period)
            .build()
            .map_err(|err| MetricSinkError::Config(format!("http policy: {err}")))
    }
}

/// Top-level configuration; each reporter is enabled by its section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    pub elasticsearch: Option<ElasticsearchSettings>,
    pub influxdb: Option<InfluxDbSettings>,
    pub console: Option<ConsoleSettings>,
    pub text_file: Option<TextFileSettings>,
    pub health_alerts: Option<HealthAlertSettings>,
}

impl ReportingConfig {
    /// Validate every present section
    pub fn validate(&self) -> Result<()> {
        if let Some(settings) = &self.elasticsearch {
            settings.validate()?;
        }
        if let Some(settings) = &self.influxdb {
            settings.validate()?;
        }
        if let Some(settings) = &self.console {
            settings.validate()?;
        }
        if let Some(settings) = &self.text_file {
            settings.validate()?;
        }
        if let Some(settings) = &self.health_alerts {
            settings.validate()?;
        }
        Ok(())
    }

    /// `true` when no reporter section is configured
    pub fn is_empty(&self) -> bool {
        self.elasticsearch.is_none()
            && self.influxdb.is_none()
            && self.console.is_none()
            && self.text_file.is_none()
            && self.health_alerts.is_none()
    }
}

/// Shared interval check used by every section
pub(crate) fn require_interval(section: &str, interval: Duration) -> Result<()> {
    if interval.is_zero() {
        return Err(MetricSinkError::Config(format!(
            "{section} report interval must be greater than 0"
        )));
    }
    Ok(())
}
