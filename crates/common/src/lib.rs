//! Common utilities shared across metricsink crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: serde helpers for configuration values
//! - `runtime`: resilience primitives (backoff circuit breaker, clocks)
//! - `observability`: tracing (pulled in by `runtime`)
//! - `test-utils`: `MockClock` for driving breaker windows without sleeping

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod utils;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod resilience;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "runtime")]
pub use resilience::{
    BackoffCircuitBreaker, BreakerState, CircuitBreakerConfig, CircuitBreakerConfigBuilder, Clock,
    ConfigError, SystemClock,
};
#[cfg(feature = "test-utils")]
pub use resilience::MockClock;
#[cfg(feature = "foundation")]
pub use utils::serde::duration_millis;
