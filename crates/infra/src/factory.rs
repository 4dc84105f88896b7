//! Assembles schedulers from a [`ReportingConfig`]
//!
//! One scheduler per configured section. Each HTTP section gets its own
//! client and circuit breaker, so an unreachable InfluxDB never backs off
//! Elasticsearch writes.

use std::sync::Arc;
use std::time::Duration;

use metricsink_core::config::{HttpPolicy, ReportingConfig};
use metricsink_core::packing::MetricPacker;
use metricsink_core::payload::{
    BulkPayloadBuilder, LineProtocolPayloadBuilder, PayloadBuilder, PlainTextPayloadBuilder,
};
use metricsink_core::ports::{BulkWriter, HealthSource, MetricsSource};
use metricsink_core::reporting::ReportRunner;
use metricsink_core::DataKeys;
use metricsink_domain::{MetricSinkError, Result};
use tracing::{info, warn};

use crate::health::ElasticHealthAlerter;
use crate::scheduling::{ReportScheduler, ReportSchedulerConfig, SchedulerError};
use crate::sinks::{BulkWriteClient, ConsoleWriter, TextFileWriter};

/// Extra time a cycle gets on top of the HTTP timeout
const CYCLE_SLACK: Duration = Duration::from_secs(5);

fn http_schedule(interval: Duration, policy: &HttpPolicy) -> ReportSchedulerConfig {
    ReportSchedulerConfig { interval, cycle_timeout: policy.timeout + CYCLE_SLACK }
}

fn schedule<B: PayloadBuilder + 'static>(
    name: &str,
    builder: B,
    writer: Arc<dyn BulkWriter>,
    source: &Arc<dyn MetricsSource>,
    packer: MetricPacker,
    config: ReportSchedulerConfig,
) -> Result<ReportScheduler> {
    let runner = ReportRunner::new(name, builder, writer, Arc::clone(source), packer);
    Ok(ReportScheduler::new(Arc::new(runner), config)?)
}

/// Build one scheduler per configured reporter
///
/// Nothing is started. Health alerts need a `health` source; configuring
/// them without one is an error.
///
/// # Errors
/// Returns `MetricSinkError::Config` if any section is invalid.
pub fn build_reporters(
    config: &ReportingConfig,
    metrics: Arc<dyn MetricsSource>,
    health: Option<Arc<dyn HealthSource>>,
) -> Result<Vec<ReportScheduler>> {
    config.validate()?;
    let mut schedulers = Vec::new();

    if let Some(settings) = &config.elasticsearch {
        let client = BulkWriteClient::elasticsearch(settings)?;
        let packer = MetricPacker::new()
            .with_data_keys(DataKeys::elasticsearch())
            .with_filter(settings.filter.clone());
        schedulers.push(schedule(
            "elasticsearch",
            BulkPayloadBuilder::new(settings.index.clone())?,
            Arc::new(client),
            &metrics,
            packer,
            http_schedule(settings.report_interval, &settings.http_policy),
        )?);
    }

    if let Some(settings) = &config.influxdb {
        let client = BulkWriteClient::influxdb(settings)?;
        schedulers.push(schedule(
            "influxdb",
            LineProtocolPayloadBuilder::new(),
            Arc::new(client),
            &metrics,
            MetricPacker::new().with_filter(settings.filter.clone()),
            http_schedule(settings.report_interval, &settings.http_policy),
        )?);
    }

    if let Some(settings) = &config.console {
        schedulers.push(schedule(
            "console",
            PlainTextPayloadBuilder::new(),
            Arc::new(ConsoleWriter::stdout()),
            &metrics,
            MetricPacker::new().with_filter(settings.filter.clone()),
            ReportSchedulerConfig::with_interval(settings.report_interval),
        )?);
    }

    if let Some(settings) = &config.text_file {
        schedulers.push(schedule(
            "text-file",
            PlainTextPayloadBuilder::new(),
            Arc::new(TextFileWriter::from_settings(settings)),
            &metrics,
            MetricPacker::new().with_filter(settings.filter.clone()),
            ReportSchedulerConfig::with_interval(settings.report_interval),
        )?);
    }

    if let Some(settings) = config.health_alerts.as_ref() {
        if !settings.enabled {
            info!("health alerts disabled, skipping");
        } else {
            let source = health.ok_or_else(|| {
                MetricSinkError::Config("health alerts configured without a health source".into())
            })?;
            let schedule = http_schedule(settings.report_interval, &settings.http_policy);
            let alerter = ElasticHealthAlerter::from_settings(settings.clone(), source)?;
            schedulers.push(ReportScheduler::new(Arc::new(alerter), schedule)?);
        }
    }

    if schedulers.is_empty() {
        warn!("no reporters configured");
    }
    Ok(schedulers)
}

/// Start every scheduler, stopping the started ones if one fails
///
/// # Errors
/// Returns the first start failure.
pub async fn start_all(schedulers: &mut [ReportScheduler]) -> Result<()> {
    for index in 0..schedulers.len() {
        if let Err(err) = schedulers[index].start().await {
            for started in &mut schedulers[..index] {
                if let Err(stop_err) = started.stop().await {
                    warn!(task = started.task_name(), error = %stop_err, "failed to stop scheduler");
                }
            }
            return Err(err.into());
        }
    }
    Ok(())
}

/// Stop every running scheduler; returns the first failure after trying all
///
/// # Errors
/// Returns the first stop failure other than `NotRunning`.
pub async fn stop_all(schedulers: &mut [ReportScheduler]) -> Result<()> {
    let mut first_error = None;
    for scheduler in schedulers.iter_mut() {
        match scheduler.stop().await {
            Ok(()) | Err(SchedulerError::NotRunning) => {}
            Err(err) => {
                warn!(task = scheduler.task_name(), error = %err, "failed to stop scheduler");
                first_error.get_or_insert(err);
            }
        }
    }
    match first_error {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}
