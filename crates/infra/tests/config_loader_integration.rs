//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files and
//! turning it into reporters.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metricsink_core::ports::MetricsSource;
use metricsink_domain::{MetricKind, MetricsSnapshot, Result};
use metricsink_infra::{build_reporters, config};
use tempfile::NamedTempFile;

struct NoMetrics;

#[async_trait]
impl MetricsSource for NoMetrics {
    async fn snapshot(&self) -> Result<MetricsSnapshot> {
        Ok(MetricsSnapshot::new(Vec::new()))
    }
}

fn write_config(contents: &str, extension: &str) -> std::path::PathBuf {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(contents.as_bytes()).expect("Failed to write to temp file");

    let path = temp_file.path().with_extension(extension);
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");
    path
}

#[test]
fn test_load_config_from_json_file() {
    let path = write_config(
        r#"{
            "elasticsearch": {
                "base_uri": "https://es.internal:9200",
                "index": "billing",
                "auth": { "username": "elastic", "password": "changeme" },
                "report_interval": 15000,
                "http_policy": {
                    "failures_before_backoff": 5,
                    "backoff_period": 60000,
                    "timeout": 10000
                },
                "filter": { "contexts": ["billing"], "kinds": ["counter", "timer"] }
            },
            "console": { "report_interval": 60000 }
        }"#,
        "json",
    );

    let result = config::load_from_file(Some(path.clone()));
    std::fs::remove_file(path).ok();
    let config = result.expect("Failed to load config from JSON file");

    let es = config.elasticsearch.as_ref().expect("elasticsearch section");
    assert_eq!(es.index, "billing");
    assert_eq!(es.report_interval, Duration::from_secs(15));
    assert_eq!(es.http_policy.failures_before_backoff, 5);
    assert_eq!(es.http_policy.backoff_period, Duration::from_secs(60));
    assert_eq!(es.http_policy.timeout, Duration::from_secs(10));
    assert_eq!(es.filter.kinds, vec![MetricKind::Counter, MetricKind::Timer]);
    assert_eq!(es.auth.resolve().unwrap().name(), "basic");

    let schedulers = build_reporters(&config, Arc::new(NoMetrics), None).unwrap();
    assert_eq!(schedulers.len(), 2);
}

#[test]
fn test_load_config_from_toml_file() {
    let path = write_config(
        r#"
[influxdb]
base_uri = "http://influx:8086"
database = "telemetry"
consistency = "one"
report_interval = 2000

[influxdb.auth]
scheme = "bearer"
token = "influx-token"

[text_file]
file_name = "/var/log/app/metrics.txt"
"#,
        "toml",
    );

    let result = config::load_from_file(Some(path.clone()));
    std::fs::remove_file(path).ok();
    let config = result.expect("Failed to load config from TOML file");

    let influx = config.influxdb.expect("influxdb section");
    assert_eq!(influx.endpoint(), "write?db=telemetry&consistency=one");
    assert_eq!(influx.report_interval, Duration::from_secs(2));
    assert_eq!(influx.auth.resolve().unwrap().name(), "bearer");

    let text = config.text_file.expect("text file section");
    assert!(!text.append);
    assert_eq!(text.report_interval, Duration::from_secs(5));
}

#[test]
fn test_unknown_auth_scheme_rejected_at_load() {
    let path = write_config(
        r#"{ "elasticsearch": { "auth": { "scheme": "ntlm" } } }"#,
        "json",
    );

    let result = config::load_from_file(Some(path.clone()));
    std::fs::remove_file(path).ok();

    let err = result.expect_err("unsupported scheme should fail");
    assert!(err.to_string().contains("ntlm"));
}

#[test]
fn test_empty_file_configures_nothing() {
    let path = write_config("{}", "json");

    let result = config::load_from_file(Some(path.clone()));
    std::fs::remove_file(path).ok();

    let config = result.expect("empty config is valid");
    assert!(config.is_empty());
}
