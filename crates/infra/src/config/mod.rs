//! Configuration loading
//!
//! Reads [`ReportingConfig`](metricsink_core::config::ReportingConfig) from
//! environment variables and files.

pub mod loader;

// Re-export commonly used items
pub use loader::{load, load_from_env, load_from_file, parse_config, probe_config_paths};
