//! Interval scheduler for report tasks
//!
//! Each scheduler owns one [`ReportTask`] and ticks it every `interval`
//! until stopped. A cycle that outlives `cycle_timeout` is cancelled and
//! counted as failed; the loop carries on with the next tick.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use metricsink_core::ports::ReportTask;
//! use metricsink_infra::scheduling::{ReportScheduler, ReportSchedulerConfig};
//!
//! # async fn example(task: Arc<dyn ReportTask>) -> Result<(), Box<dyn std::error::Error>> {
//! let mut scheduler = ReportScheduler::new(
//!     task,
//!     ReportSchedulerConfig::with_interval(Duration::from_secs(10)),
//! )?;
//!
//! scheduler.start().await?;
//! // ... application runs ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use metricsink_core::ports::ReportTask;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for [`ReportScheduler`]
#[derive(Debug, Clone)]
pub struct ReportSchedulerConfig {
    /// Delay between the end of one tick and the start of the next
    pub interval: Duration,
    /// Upper bound for a single cycle
    pub cycle_timeout: Duration,
}

impl Default for ReportSchedulerConfig {
    fn default() -> Self {
        Self { interval: Duration::from_secs(10), cycle_timeout: Duration::from_secs(60) }
    }
}

impl ReportSchedulerConfig {
    pub fn with_interval(interval: Duration) -> Self {
        Self { interval, ..Self::default() }
    }
}

/// Periodic driver for one report task
pub struct ReportScheduler {
    task: Arc<dyn ReportTask>,
    config: ReportSchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl ReportScheduler {
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] for a zero interval or timeout
    pub fn new(task: Arc<dyn ReportTask>, config: ReportSchedulerConfig) -> SchedulerResult<Self> {
        if config.interval.is_zero() {
            return Err(SchedulerError::InvalidConfig("interval must be greater than 0".into()));
        }
        if config.cycle_timeout.is_zero() {
            return Err(SchedulerError::InvalidConfig(
                "cycle timeout must be greater than 0".into(),
            ));
        }

        Ok(Self {
            task,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        })
    }

    pub fn task_name(&self) -> &str {
        self.task.name()
    }

    pub fn config(&self) -> &ReportSchedulerConfig {
        &self.config
    }

    /// Start ticking in a background task
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is already running
    #[instrument(skip(self), fields(task = self.task.name()))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!(interval_ms = self.config.interval.as_millis() as u64, "Starting report scheduler");

        // Fresh token so a stopped scheduler can be restarted
        self.cancellation_token = CancellationToken::new();

        let task = Arc::clone(&self.task);
        let config = self.config.clone();
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::report_loop(task, config, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);
        Ok(())
    }

    /// Cancel the loop, including any in-flight write, and await it
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is not running or the loop does not exit
    /// within five seconds
    #[instrument(skip(self), fields(task = self.task.name()))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        info!("Stopping report scheduler");
        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            tokio::time::timeout(JOIN_TIMEOUT, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: JOIN_TIMEOUT.as_secs() })?
                .map_err(|err| SchedulerError::TaskJoinFailed(err.to_string()))?;
        }

        info!("Report scheduler stopped");
        Ok(())
    }

    /// `true` while the background loop is alive
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    async fn report_loop(
        task: Arc<dyn ReportTask>,
        config: ReportSchedulerConfig,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(task = task.name(), "Report loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(config.interval) => {
                    Self::tick(task.as_ref(), &config, &cancel).await;
                }
            }
        }
    }

    async fn tick(task: &dyn ReportTask, config: &ReportSchedulerConfig, cancel: &CancellationToken) {
        let started = Instant::now();
        let cycle_cancel = cancel.child_token();

        match tokio::time::timeout(config.cycle_timeout, task.run_once(&cycle_cancel)).await {
            Ok(true) => {
                debug!(
                    task = task.name(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Report tick completed"
                );
            }
            Ok(false) => {
                debug!(task = task.name(), "Report tick did not flush");
            }
            Err(_) => {
                cycle_cancel.cancel();
                warn!(
                    task = task.name(),
                    timeout_secs = config.cycle_timeout.as_secs(),
                    "Report tick timed out"
                );
            }
        }
    }
}

impl Drop for ReportScheduler {
    fn drop(&mut self) {
        if !self.cancellation_token.is_cancelled() && self.is_running() {
            warn!(task = self.task.name(), "ReportScheduler dropped while running; cancelling");
            self.cancellation_token.cancel();
        }
    }
}
