//! Concrete [`BulkWriter`](metricsink_core::ports::BulkWriter) sinks
//!
//! - [`BulkWriteClient`]: HTTP bulk writes behind a circuit breaker
//! - [`ConsoleWriter`]: stdout
//! - [`TextFileWriter`]: local report file

pub mod bulk_client;
pub mod console;
pub mod endpoints;
pub mod text_file;

pub use bulk_client::BulkWriteClient;
pub use console::ConsoleWriter;
pub use endpoints::{BulkEndpoint, ElasticsearchEndpoint, InfluxDbEndpoint};
pub use text_file::TextFileWriter;
