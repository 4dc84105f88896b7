//! # metricsink Domain
//!
//! Data types shared by every reporter.
//!
//! This crate contains:
//! - Metric documents, tags and value snapshots
//! - Health check results
//! - Name and tag formatters
//! - Domain error types and Result definitions
//!
//! ## Architecture
//! - No dependencies on other metricsink crates
//! - Only external dependencies allowed
//! - Pure data structures, no I/O

#[macro_use]
pub mod macros;
pub mod constants;
pub mod errors;
pub mod formatting;
pub mod types;

// Re-export commonly used items
pub use errors::*;
pub use types::*;
