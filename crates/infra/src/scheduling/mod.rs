//! Scheduling for report tasks
//!
//! Every scheduler follows the same runtime rules:
//! - Explicit lifecycle management (start/stop)
//! - Join handles for spawned tasks
//! - Cancellation token support
//! - Timeout wrapping on each cycle

pub mod error;
pub mod report_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use report_scheduler::{ReportScheduler, ReportSchedulerConfig};
