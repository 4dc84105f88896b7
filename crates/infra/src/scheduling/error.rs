//! Scheduler error types

use metricsink_domain::MetricSinkError;
use thiserror::Error;

use crate::errors::InfraError;

/// Scheduler-specific errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Scheduler is already running
    #[error("Scheduler already running")]
    AlreadyRunning,

    /// Scheduler is not running
    #[error("Scheduler not running")]
    NotRunning,

    /// Interval or timeout rejected at construction
    #[error("Invalid scheduler configuration: {0}")]
    InvalidConfig(String),

    /// Operation timed out
    #[error("Operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Task join failed
    #[error("Task join failed: {0}")]
    TaskJoinFailed(String),
}

impl From<SchedulerError> for InfraError {
    fn from(err: SchedulerError) -> Self {
        let sink_err = match err {
            SchedulerError::AlreadyRunning | SchedulerError::NotRunning => {
                MetricSinkError::Validation(err.to_string())
            }
            SchedulerError::InvalidConfig(_) => MetricSinkError::Config(err.to_string()),
            _ => MetricSinkError::Internal(err.to_string()),
        };
        InfraError(sink_err)
    }
}

impl From<SchedulerError> for MetricSinkError {
    fn from(err: SchedulerError) -> Self {
        InfraError::from(err).into()
    }
}

/// Convenience type alias for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;
