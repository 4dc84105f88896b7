//! # metricsink Infrastructure
//!
//! I/O implementations of the ports defined in `metricsink-core`.
//!
//! This crate contains:
//! - The HTTP bulk client with its circuit breaker, plus console and file sinks
//! - Interval schedulers that drive report cycles
//! - The Elasticsearch health alerter
//! - Configuration loading from the environment and files
//! - Tracing subscriber setup
//!
//! ## Architecture
//! - Implements traits defined in `metricsink-core`
//! - Depends on `metricsink-common`, `metricsink-domain` and `metricsink-core`
//! - Contains all "impure" code (HTTP, files, timers)

pub mod config;
pub mod errors;
pub mod factory;
pub mod health;
pub mod http;
pub mod observability;
pub mod scheduling;
pub mod sinks;

// Re-export commonly used items
pub use errors::InfraError;
pub use factory::{build_reporters, start_all, stop_all};
pub use health::ElasticHealthAlerter;
pub use http::{HttpClient, HttpClientBuilder};
pub use observability::{init_tracing, LogFormat};
pub use scheduling::{ReportScheduler, ReportSchedulerConfig, SchedulerError};
pub use sinks::{
    BulkEndpoint, BulkWriteClient, ConsoleWriter, ElasticsearchEndpoint, InfluxDbEndpoint,
    TextFileWriter,
};
