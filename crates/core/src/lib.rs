//! # metricsink Core
//!
//! Reporter logic with no I/O of its own.
//!
//! This crate contains:
//! - Reporter configuration and validation
//! - Payload builders for the bulk, line-protocol and text formats
//! - Value-source packing
//! - The report cycle runner
//! - Port interfaces (traits) implemented by `metricsink-infra`
//!
//! ## Architecture Principles
//! - Only depends on `metricsink-common` and `metricsink-domain`
//! - No HTTP, file or platform code
//! - All external collaborators via traits

pub mod config;
pub mod data_keys;
pub mod packing;
pub mod payload;
pub mod ports;
pub mod reporting;

pub use config::{
    AuthScheme, AuthSettings, ConsoleSettings, ElasticsearchSettings, HealthAlertSettings,
    HttpPolicy, InfluxDbSettings, ReportingConfig, TextFileSettings,
};
pub use data_keys::DataKeys;
pub use packing::{MetricFilter, MetricPacker, PackSummary};
pub use payload::{
    BulkPayloadBuilder, DocumentBatch, LineProtocolPayloadBuilder, PayloadBuilder, PayloadError,
    PlainTextPayloadBuilder,
};
pub use ports::{BulkWriter, HealthSource, MetricsSource, ReportTask, WriteResult};
pub use reporting::{CycleOutcome, ReportPhase, ReportRunner};
