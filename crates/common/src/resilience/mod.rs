//! Resilience patterns for outbound metric sinks
//!
//! - **Circuit Breaker**: counts consecutive write failures and refuses
//!   writes for a backoff window once a threshold is crossed
//!
//! The breaker is generic over a [`Clock`] so backoff behavior can be tested
//! deterministically with `MockClock` (feature `test-utils`).

pub mod circuit_breaker;

#[cfg(any(test, feature = "test-utils"))]
pub use circuit_breaker::MockClock;
pub use circuit_breaker::{
    BackoffCircuitBreaker, BreakerState, CircuitBreakerConfig, CircuitBreakerConfigBuilder, Clock,
    ConfigError, ConfigResult, SystemClock, DEFAULT_BACKOFF_PERIOD, DEFAULT_FAILURES_BEFORE_BACKOFF,
};
