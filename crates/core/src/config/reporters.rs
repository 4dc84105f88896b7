//! Per-reporter settings

use std::path::PathBuf;
use std::time::Duration;

use metricsink_common::duration_millis;
use metricsink_domain::{MetricSinkError, Result};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use super::{require_interval, AuthSettings, HttpPolicy};
use crate::packing::MetricFilter;

fn require_base_uri(section: &str, base_uri: &str) -> Result<()> {
    let trimmed = base_uri.trim();
    if trimmed.is_empty() {
        return Err(MetricSinkError::Config(format!("{section} base uri is required")));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(MetricSinkError::Config(format!(
            "{section} base uri must be an http(s) url, got '{trimmed}'"
        )));
    }
    Ok(())
}

/// Elasticsearch bulk reporter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticsearchSettings {
    pub base_uri: String,
    pub index: String,
    pub auth: AuthSettings,
    #[serde(with = "duration_millis")]
    pub report_interval: Duration,
    pub http_policy: HttpPolicy,
    pub filter: MetricFilter,
}

impl Default for ElasticsearchSettings {
    fn default() -> Self {
        Self {
            base_uri: "http://localhost:9200".into(),
            index: "metrics".into(),
            auth: AuthSettings::default(),
            report_interval: Duration::from_secs(10),
            http_policy: HttpPolicy::default(),
            filter: MetricFilter::default(),
        }
    }
}

impl ElasticsearchSettings {
    pub fn validate(&self) -> Result<()> {
        require_base_uri("elasticsearch", &self.base_uri)?;
        if self.index.trim().is_empty() {
            return Err(MetricSinkError::Config("elasticsearch index is required".into()));
        }
        require_interval("elasticsearch", self.report_interval)?;
        self.auth.resolve()?;
        self.http_policy.validate()
    }
}

/// InfluxDB line-protocol reporter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfluxDbSettings {
    pub base_uri: String,
    pub database: String,
    pub retention_policy: Option<String>,
    pub consistency: Option<String>,
    pub auth: AuthSettings,
    #[serde(with = "duration_millis")]
    pub report_interval: Duration,
    pub http_policy: HttpPolicy,
    pub filter: MetricFilter,
}

impl Default for InfluxDbSettings {
    fn default() -> Self {
        Self {
            base_uri: "http://localhost:8086".into(),
            database: "metrics".into(),
            retention_policy: None,
            consistency: None,
            auth: AuthSettings::default(),
            report_interval: Duration::from_secs(5),
            http_policy: HttpPolicy::default(),
            filter: MetricFilter::default(),
        }
    }
}

impl InfluxDbSettings {
    pub fn validate(&self) -> Result<()> {
        require_base_uri("influxdb", &self.base_uri)?;
        if self.database.trim().is_empty() {
            return Err(MetricSinkError::Config("influxdb database is required".into()));
        }
        require_interval("influxdb", self.report_interval)?;
        self.auth.resolve()?;
        self.http_policy.validate()
    }

    /// Relative write path, e.g. `write?db=metrics&rp=weekly`
    ///
    /// Query values are form-encoded, so a database named `a&b` stays one
    /// parameter.
    pub fn endpoint(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("db", self.database.trim());
        if let Some(rp) = present(self.retention_policy.as_deref()) {
            query.append_pair("rp", rp);
        }
        if let Some(consistency) = present(self.consistency.as_deref()) {
            query.append_pair("consistency", consistency);
        }
        format!("write?{}", query.finish())
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Human-readable reporter writing to stdout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSettings {
    #[serde(with = "duration_millis")]
    pub report_interval: Duration,
    pub filter: MetricFilter,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self { report_interval: Duration::from_secs(30), filter: MetricFilter::default() }
    }
}

impl ConsoleSettings {
    pub fn validate(&self) -> Result<()> {
        require_interval("console", self.report_interval)
    }
}

/// Human-readable reporter writing to a file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextFileSettings {
    pub file_name: PathBuf,
    /// Append each cycle instead of replacing the file contents
    pub append: bool,
    #[serde(with = "duration_millis")]
    pub report_interval: Duration,
    pub filter: MetricFilter,
}

impl Default for TextFileSettings {
    fn default() -> Self {
        Self {
            file_name: PathBuf::from("metrics.txt"),
            append: false,
            report_interval: Duration::from_secs(5),
            filter: MetricFilter::default(),
        }
    }
}

impl TextFileSettings {
    pub fn validate(&self) -> Result<()> {
        if self.file_name.as_os_str().is_empty() {
            return Err(MetricSinkError::Config("text file reporter requires a file name".into()));
        }
        require_interval("text file", self.report_interval)
    }
}

/// Health status alerts written to Elasticsearch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthAlertSettings {
    pub enabled: bool,
    pub alert_on_degraded_checks: bool,
    /// Runs after which still-failing checks are alerted again
    pub runs_before_report_existing_failures: u32,
    pub application_name: String,
    pub base_uri: String,
    pub index: String,
    pub auth: AuthSettings,
    #[serde(with = "duration_millis")]
    pub report_interval: Duration,
    pub http_policy: HttpPolicy,
}

impl Default for HealthAlertSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            alert_on_degraded_checks: true,
            runs_before_report_existing_failures: 10,
            application_name: "application".into(),
            base_uri: "http://localhost:9200".into(),
            index: "health".into(),
            auth: AuthSettings::default(),
            report_interval: Duration::from_secs(10),
            http_policy: HttpPolicy::default(),
        }
    }
}

impl HealthAlertSettings {
    pub fn validate(&self) -> Result<()> {
        require_base_uri("health alert", &self.base_uri)?;
        if self.index.trim().is_empty() {
            return Err(MetricSinkError::Config("health alert index is required".into()));
        }
        if self.application_name.trim().is_empty() {
            return Err(MetricSinkError::Config(
                "health alert application name is required".into(),
            ));
        }
        require_interval("health alert", self.report_interval)?;
        self.auth.resolve()?;
        self.http_policy.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ElasticsearchSettings::default().validate().is_ok());
        assert!(InfluxDbSettings::default().validate().is_ok());
        assert!(ConsoleSettings::default().validate().is_ok());
        assert!(TextFileSettings::default().validate().is_ok());
        assert!(HealthAlertSettings::default().validate().is_ok());
    }

    #[test]
    fn test_elasticsearch_requires_index() {
        let settings = ElasticsearchSettings { index: "  ".into(), ..Default::default() };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("index"));
    }

    #[test]
    fn test_base_uri_must_be_http() {
        let settings = ElasticsearchSettings { base_uri: "localhost:9200".into(), ..Default::default() };
        assert!(matches!(settings.validate(), Err(MetricSinkError::Config(_))));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let settings = ConsoleSettings { report_interval: Duration::ZERO, ..Default::default() };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_bad_auth_fails_section_validation() {
        let settings = InfluxDbSettings {
            auth: AuthSettings { scheme: Some("digest".into()), ..AuthSettings::default() },
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(MetricSinkError::Config(_))));
    }

    #[test]
    fn test_influx_endpoint_query() {
        let mut settings = InfluxDbSettings::default();
        assert_eq!(settings.endpoint(), "write?db=metrics");

        settings.retention_policy = Some("weekly".into());
        settings.consistency = Some("all".into());
        assert_eq!(settings.endpoint(), "write?db=metrics&rp=weekly&consistency=all");
    }

    /// Validates that reserved characters cannot split or truncate the query.
    #[test]
    fn test_influx_endpoint_encodes_values() {
        let settings = InfluxDbSettings {
            database: "team&ops#1".into(),
            retention_policy: Some("two weeks".into()),
            consistency: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(settings.endpoint(), "write?db=team%26ops%231&rp=two+weeks");
    }
}
