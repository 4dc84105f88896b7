//! Configuration loader
//!
//! Loads [`ReportingConfig`] from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Load `.env` (if present) and read `METRICSINK_*` variables
//! 2. If no reporter is configured there, fall back to a config file
//! 3. Probe multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! A reporter section is enabled by its first variable below.
//! - `METRICSINK_ELASTICSEARCH_URI`, `_INDEX`, `_USERNAME`, `_PASSWORD`,
//!   `_TOKEN`, `_INTERVAL_MS`
//! - `METRICSINK_INFLUXDB_URI`, `_DATABASE`, `_RETENTION_POLICY`,
//!   `_CONSISTENCY`, `_USERNAME`, `_PASSWORD`, `_TOKEN`, `_INTERVAL_MS`
//! - `METRICSINK_CONSOLE_ENABLED` (true/false), `_INTERVAL_MS`
//! - `METRICSINK_TEXT_FILE_PATH`, `_APPEND` (true/false), `_INTERVAL_MS`
//! - `METRICSINK_HEALTH_URI`, `_APPLICATION`, `_INDEX`, `_ALERT_DEGRADED`,
//!   `_RUNS_BEFORE_REALERT`, `_INTERVAL_MS`
//! - `METRICSINK_FAILURES_BEFORE_BACKOFF`, `METRICSINK_BACKOFF_PERIOD_MS`,
//!   `METRICSINK_TIMEOUT_MS`: HTTP policy for every HTTP section
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./metricsink.json` or `./metricsink.toml` (current working directory)
//! 2. `../metricsink.json` or `../metricsink.toml` (parent directory)
//! 3. `../../metricsink.json` or `../../metricsink.toml`
//! 4. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use metricsink_core::config::{
    AuthSettings, ConsoleSettings, ElasticsearchSettings, HealthAlertSettings, HttpPolicy,
    InfluxDbSettings, ReportingConfig, TextFileSettings,
};
use metricsink_domain::{MetricSinkError, Result};

use crate::errors::InfraError;

const FILE_STEM: &str = "metricsink";

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `MetricSinkError::Config` if neither source yields a valid
/// configuration.
pub fn load() -> Result<ReportingConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// A `.env` file in the working directory is read first. At least one
/// reporter section must be configured.
///
/// # Errors
/// Returns `MetricSinkError::Config` if no reporter is configured or a value
/// does not parse.
pub fn load_from_env() -> Result<ReportingConfig> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    let policy = http_policy_from_env()?;
    let config = ReportingConfig {
        elasticsearch: elasticsearch_from_env(&policy)?,
        influxdb: influxdb_from_env(&policy)?,
        console: console_from_env()?,
        text_file: text_file_from_env()?,
        health_alerts: health_from_env(&policy)?,
    };

    if config.is_empty() {
        return Err(MetricSinkError::Config(
            "No reporter configured in environment variables".to_string(),
        ));
    }

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `MetricSinkError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - A section fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<ReportingConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(MetricSinkError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            MetricSinkError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| MetricSinkError::Config(format!("Failed to read config file: {}", e)))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
pub fn parse_config(contents: &str, path: &Path) -> Result<ReportingConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents).map_err(|e| InfraError::from(e).into()),
        "json" => serde_json::from_str(contents)
            .map_err(|e| MetricSinkError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(MetricSinkError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
        }
    }

    roots
        .iter()
        .flat_map(|root| {
            ["", "..", "../.."].into_iter().flat_map(move |up| {
                ["json", "toml"]
                    .into_iter()
                    .map(move |ext| root.join(up).join(format!("{FILE_STEM}.{ext}")))
            })
        })
        .find(|path| path.exists())
}

fn elasticsearch_from_env(policy: &HttpPolicy) -> Result<Option<ElasticsearchSettings>> {
    let Some(base_uri) = env_opt("METRICSINK_ELASTICSEARCH_URI") else {
        return Ok(None);
    };
    let defaults = ElasticsearchSettings::default();

    Ok(Some(ElasticsearchSettings {
        base_uri,
        index: env_opt("METRICSINK_ELASTICSEARCH_INDEX").unwrap_or(defaults.index),
        auth: auth_from_env("METRICSINK_ELASTICSEARCH"),
        report_interval: env_millis("METRICSINK_ELASTICSEARCH_INTERVAL_MS")?
            .unwrap_or(defaults.report_interval),
        http_policy: policy.clone(),
        filter: defaults.filter,
    }))
}

fn influxdb_from_env(policy: &HttpPolicy) -> Result<Option<InfluxDbSettings>> {
    let Some(base_uri) = env_opt("METRICSINK_INFLUXDB_URI") else {
        return Ok(None);
    };
    let defaults = InfluxDbSettings::default();

    Ok(Some(InfluxDbSettings {
        base_uri,
        database: env_opt("METRICSINK_INFLUXDB_DATABASE").unwrap_or(defaults.database),
        retention_policy: env_opt("METRICSINK_INFLUXDB_RETENTION_POLICY"),
        consistency: env_opt("METRICSINK_INFLUXDB_CONSISTENCY"),
        auth: auth_from_env("METRICSINK_INFLUXDB"),
        report_interval: env_millis("METRICSINK_INFLUXDB_INTERVAL_MS")?
            .unwrap_or(defaults.report_interval),
        http_policy: policy.clone(),
        filter: defaults.filter,
    }))
}

fn console_from_env() -> Result<Option<ConsoleSettings>> {
    if !env_bool("METRICSINK_CONSOLE_ENABLED", false) {
        return Ok(None);
    }
    let defaults = ConsoleSettings::default();

    Ok(Some(ConsoleSettings {
        report_interval: env_millis("METRICSINK_CONSOLE_INTERVAL_MS")?
            .unwrap_or(defaults.report_interval),
        filter: defaults.filter,
    }))
}

fn text_file_from_env() -> Result<Option<TextFileSettings>> {
    let Some(file_name) = env_opt("METRICSINK_TEXT_FILE_PATH") else {
        return Ok(None);
    };
    let defaults = TextFileSettings::default();

    Ok(Some(TextFileSettings {
        file_name: PathBuf::from(file_name),
        append: env_bool("METRICSINK_TEXT_FILE_APPEND", defaults.append),
        report_interval: env_millis("METRICSINK_TEXT_FILE_INTERVAL_MS")?
            .unwrap_or(defaults.report_interval),
        filter: defaults.filter,
    }))
}

fn health_from_env(policy: &HttpPolicy) -> Result<Option<HealthAlertSettings>> {
    let Some(base_uri) = env_opt("METRICSINK_HEALTH_URI") else {
        return Ok(None);
    };
    let defaults = HealthAlertSettings::default();

    Ok(Some(HealthAlertSettings {
        enabled: true,
        alert_on_degraded_checks: env_bool(
            "METRICSINK_HEALTH_ALERT_DEGRADED",
            defaults.alert_on_degraded_checks,
        ),
        runs_before_report_existing_failures: env_parse("METRICSINK_HEALTH_RUNS_BEFORE_REALERT")?
            .unwrap_or(defaults.runs_before_report_existing_failures),
        application_name: env_opt("METRICSINK_HEALTH_APPLICATION")
            .unwrap_or(defaults.application_name),
        base_uri,
        index: env_opt("METRICSINK_HEALTH_INDEX").unwrap_or(defaults.index),
        auth: auth_from_env("METRICSINK_HEALTH"),
        report_interval: env_millis("METRICSINK_HEALTH_INTERVAL_MS")?
            .unwrap_or(defaults.report_interval),
        http_policy: policy.clone(),
    }))
}

fn http_policy_from_env() -> Result<HttpPolicy> {
    let defaults = HttpPolicy::default();
    Ok(HttpPolicy {
        failures_before_backoff: env_parse("METRICSINK_FAILURES_BEFORE_BACKOFF")?
            .unwrap_or(defaults.failures_before_backoff),
        backoff_period: env_millis("METRICSINK_BACKOFF_PERIOD_MS")?
            .unwrap_or(defaults.backoff_period),
        timeout: env_millis("METRICSINK_TIMEOUT_MS")?.unwrap_or(defaults.timeout),
    })
}

fn auth_from_env(prefix: &str) -> AuthSettings {
    AuthSettings {
        scheme: env_opt(&format!("{prefix}_AUTH_SCHEME")),
        username: env_opt(&format!("{prefix}_USERNAME")),
        password: env_opt(&format!("{prefix}_PASSWORD")),
        token: env_opt(&format!("{prefix}_TOKEN")),
    }
}

/// Non-blank environment variable
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Parse an optional environment variable
///
/// # Errors
/// Returns `MetricSinkError::Config` if the variable is set but invalid.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| MetricSinkError::Config(format!("Invalid value for {}: {}", key, e)))
        })
        .transpose()
}

fn env_millis(key: &str) -> Result<Option<Duration>> {
    Ok(env_parse::<u64>(key)?.map(Duration::from_millis))
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
