//! Integration tests for the resilience module
//!
//! Drives the backoff circuit breaker the way a bulk writer does: consult
//! `should_backoff`, attempt the write, then record the outcome.

#![cfg(feature = "test-utils")]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use metricsink_common::resilience::{
    BackoffCircuitBreaker, BreakerState, CircuitBreakerConfig, MockClock,
};

/// Simulated sink call guarded by the breaker; returns whether the sink was hit.
fn guarded_write<F>(breaker: &BackoffCircuitBreaker<MockClock>, sink: F) -> bool
where
    F: FnOnce() -> bool,
{
    if breaker.should_backoff() {
        return false;
    }

    if sink() {
        breaker.record_success();
    } else {
        breaker.record_failure();
    }
    true
}

fn mock_breaker(threshold: u64, period: Duration) -> (Arc<BackoffCircuitBreaker<MockClock>>, MockClock) {
    let clock = MockClock::new();
    let config = CircuitBreakerConfig::builder()
        .failure_threshold(threshold)
        .backoff_period(period)
        .build()
        .expect("valid config");
    let breaker = BackoffCircuitBreaker::with_clock(config, clock.clone()).expect("breaker builds");
    (Arc::new(breaker), clock)
}

/// Validates the write budget against a permanently failing sink.
///
/// # Test Steps
/// 1. Issue ten writes against a sink that always fails
/// 2. Verify only the threshold number of writes reached the sink
/// 3. Let the backoff window elapse
/// 4. Verify the next write reaches the sink and re-opens the breaker
#[test]
fn test_failing_sink_is_shielded_during_backoff() {
    let (breaker, clock) = mock_breaker(3, Duration::from_secs(1));
    let calls = AtomicU32::new(0);

    for _ in 0..10 {
        guarded_write(&breaker, || {
            calls.fetch_add(1, Ordering::SeqCst);
            false
        });
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(breaker.state(), BreakerState::Open);

    clock.advance(Duration::from_millis(1_001));
    let attempted = guarded_write(&breaker, || {
        calls.fetch_add(1, Ordering::SeqCst);
        false
    });

    assert!(attempted, "probe write should reach the sink");
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(breaker.state(), BreakerState::Open);
}

/// Validates recovery once the sink comes back.
///
/// # Test Steps
/// 1. Open the breaker with failing writes
/// 2. Elapse the window and succeed on the probe
/// 3. Verify subsequent writes flow and a single failure does not re-open
#[test]
fn test_recovered_sink_closes_breaker() {
    let (breaker, clock) = mock_breaker(2, Duration::from_secs(30));

    guarded_write(&breaker, || false);
    guarded_write(&breaker, || false);
    assert!(!guarded_write(&breaker, || true), "breaker should refuse while open");

    clock.advance(Duration::from_secs(31));
    assert!(guarded_write(&breaker, || true));
    assert_eq!(breaker.failure_count(), 0);

    assert!(guarded_write(&breaker, || false));
    assert!(guarded_write(&breaker, || true));
    assert_eq!(breaker.state(), BreakerState::Closed);
}

/// Validates that one breaker shared by two writers tracks a joint streak.
#[tokio::test(flavor = "multi_thread")]
async fn test_shared_breaker_across_tasks() {
    let (breaker, _clock) = mock_breaker(4, Duration::from_secs(60));

    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let breaker = Arc::clone(&breaker);
            tokio::spawn(async move {
                for _ in 0..2 {
                    guarded_write(&breaker, || false);
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.expect("task completes");
    }

    assert_eq!(breaker.failure_count(), 4);
    assert!(breaker.should_backoff());
}

#[test]
fn test_system_clock_breaker_with_defaults() {
    let breaker = BackoffCircuitBreaker::with_defaults();
    assert_eq!(breaker.config().failure_threshold, 3);
    assert_eq!(breaker.config().backoff_period, Duration::from_secs(30));

    for _ in 0..3 {
        breaker.record_failure();
    }
    assert!(breaker.should_backoff());
}
