//! Failure-counting backoff circuit breaker
//!
//! The breaker guards an outbound sink against a failing downstream store. It
//! counts consecutive failures and, once the configured threshold is reached,
//! refuses calls until a backoff window has elapsed. When the window expires
//! the next caller is let through as a probe; a probe failure re-opens the
//! breaker for a fresh window and a success closes it.
//!
//! State is instance-scoped. Share one breaker between several clients by
//! wrapping it in an [`Arc`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, info, warn};

//==============================================================================
// Time Abstraction for Testability
//==============================================================================

/// Trait for time operations to enable deterministic testing
///
/// Production code uses [`SystemClock`]; tests drive the breaker with
/// `MockClock` (feature `test-utils`) so backoff windows can elapse without sleeping.
pub trait Clock: Send + Sync + 'static {
    /// Get current instant (monotonic time)
    fn now(&self) -> Instant;

    /// Get current system time (wall clock)
    fn system_time(&self) -> SystemTime;

    /// Get milliseconds since UNIX epoch
    fn millis_since_epoch(&self) -> u64 {
        self.system_time().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
    }
}

/// Real system clock implementation for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

impl<T: Clock> Clock for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn system_time(&self) -> SystemTime {
        (**self).system_time()
    }
}

#[cfg(any(test, feature = "test-utils"))]
/// Mock clock for deterministic testing
///
/// Clones share the same elapsed offset, so a test can keep one handle and
/// hand another to the breaker.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    elapsed: Arc<Mutex<Duration>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockClock {
    /// Create a new mock clock starting at the current instant
    pub fn new() -> Self {
        Self { start: Instant::now(), elapsed: Arc::new(Mutex::new(Duration::ZERO)) }
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *elapsed += duration;
    }

    /// Set the mock clock to a specific elapsed time
    pub fn set_elapsed(&self, duration: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *elapsed = duration;
    }

    /// Get the current elapsed time
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH + self.elapsed()
    }
}

//==============================================================================
// Configuration
//==============================================================================

/// Simple configuration error for validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Configuration result type using simple config errors
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Default number of consecutive failures that opens the breaker
pub const DEFAULT_FAILURES_BEFORE_BACKOFF: u64 = 3;

/// Default length of the backoff window
pub const DEFAULT_BACKOFF_PERIOD: Duration = Duration::from_secs(30);

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before writes are refused
    pub failure_threshold: u64,
    /// How long writes are refused once the threshold is crossed
    pub backoff_period: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURES_BEFORE_BACKOFF,
            backoff_period: DEFAULT_BACKOFF_PERIOD,
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a configuration builder
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::Invalid {
                message: "failure_threshold must be greater than 0".to_string(),
            });
        }

        if self.backoff_period.is_zero() {
            return Err(ConfigError::Invalid {
                message: "backoff_period must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Builder for [`CircuitBreakerConfig`]
#[derive(Debug, Default)]
pub struct CircuitBreakerConfigBuilder {
    config: CircuitBreakerConfig,
}

impl CircuitBreakerConfigBuilder {
    pub fn new() -> Self {
        Self { config: CircuitBreakerConfig::default() }
    }

    pub fn failure_threshold(mut self, threshold: u64) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    pub fn backoff_period(mut self, period: Duration) -> Self {
        self.config.backoff_period = period;
        self
    }

    pub fn build(self) -> ConfigResult<CircuitBreakerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

//==============================================================================
// Breaker
//==============================================================================

/// Observable breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Writes proceed
    Closed,
    /// Writes are refused until the backoff deadline passes
    Open,
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "CLOSED"),
            Self::Open => write!(f, "OPEN"),
        }
    }
}

#[derive(Debug, Default)]
struct BackoffWindow {
    until: Option<Instant>,
    probing: bool,
}

/// Consecutive-failure circuit breaker with a fixed backoff window
///
/// The failure counter is atomic so the closed fast path never takes a lock.
/// Every transition that touches the backoff deadline happens under the
/// window mutex, which keeps concurrent callers from opening or closing the
/// breaker twice.
pub struct BackoffCircuitBreaker<C: Clock = SystemClock> {
    config: CircuitBreakerConfig,
    failures: AtomicU64,
    window: Mutex<BackoffWindow>,
    clock: C,
}

impl<C: Clock> fmt::Debug for BackoffCircuitBreaker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackoffCircuitBreaker")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("failures", &self.failures.load(Ordering::Acquire))
            .finish()
    }
}

impl BackoffCircuitBreaker<SystemClock> {
    /// Create a breaker backed by the system clock
    pub fn new(config: CircuitBreakerConfig) -> ConfigResult<Self> {
        Self::with_clock(config, SystemClock)
    }

    /// Create a breaker with the default threshold and backoff period
    pub fn with_defaults() -> Self {
        Self {
            config: CircuitBreakerConfig::default(),
            failures: AtomicU64::new(0),
            window: Mutex::new(BackoffWindow::default()),
            clock: SystemClock,
        }
    }
}

impl<C: Clock> BackoffCircuitBreaker<C> {
    /// Create a breaker with a custom clock (useful for testing)
    pub fn with_clock(config: CircuitBreakerConfig, clock: C) -> ConfigResult<Self> {
        config.validate()?;

        Ok(Self {
            config,
            failures: AtomicU64::new(0),
            window: Mutex::new(BackoffWindow::default()),
            clock,
        })
    }

    /// The configuration this breaker was built with
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current consecutive failure count
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Acquire)
    }

    fn lock_window(&self) -> MutexGuard<'_, BackoffWindow> {
        self.window.lock().unwrap_or_else(|poisoned| {
            warn!("circuit breaker window lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Record a failed write
    ///
    /// Opens the breaker the first time the threshold is reached. A failure
    /// of the probe that follows an expired window re-opens it immediately.
    pub fn record_failure(&self) {
        let mut window = self.lock_window();
        let now = self.clock.now();

        if window.probing {
            window.probing = false;
            window.until = Some(now + self.config.backoff_period);
            self.failures.store(self.config.failure_threshold, Ordering::Release);
            warn!(
                backoff_secs = self.config.backoff_period.as_secs_f64(),
                "probe write failed, circuit re-opened"
            );
            return;
        }

        let failures = self.failures.fetch_add(1, Ordering::AcqRel) + 1;
        if failures >= self.config.failure_threshold && window.until.is_none() {
            window.until = Some(now + self.config.backoff_period);
            warn!(
                failures,
                backoff_secs = self.config.backoff_period.as_secs_f64(),
                "failure threshold reached, circuit opened"
            );
        } else {
            debug!(failures, "write failure recorded");
        }
    }

    /// Record a successful write, fully closing the breaker
    pub fn record_success(&self) {
        let mut window = self.lock_window();
        let previous = self.failures.swap(0, Ordering::AcqRel);
        window.until = None;
        window.probing = false;
        if previous >= self.config.failure_threshold {
            info!(previous_failures = previous, "write succeeded, circuit closed");
        }
    }

    /// Whether the caller should skip the write
    ///
    /// Returns `true` while the failure count is at or above the threshold
    /// and the backoff deadline is still ahead. Once the deadline has passed
    /// the counter and deadline are reset and the call is let through.
    pub fn should_backoff(&self) -> bool {
        if self.failures.load(Ordering::Acquire) < self.config.failure_threshold {
            return false;
        }

        let mut window = self.lock_window();
        // Re-check under the lock: a concurrent probe may already have reset.
        if self.failures.load(Ordering::Acquire) < self.config.failure_threshold {
            return false;
        }

        let now = self.clock.now();
        let until = *window.until.get_or_insert(now + self.config.backoff_period);
        if now < until {
            return true;
        }

        self.failures.store(0, Ordering::Release);
        window.until = None;
        window.probing = true;
        info!("backoff window elapsed, allowing probe write");
        false
    }

    /// Forget a probe that ended without an outcome
    ///
    /// A cancelled probe records neither success nor failure; without this
    /// the next unrelated failure would be taken as the probe's result.
    pub fn abandon_probe(&self) {
        let mut window = self.lock_window();
        if window.probing {
            window.probing = false;
            debug!("probe write abandoned");
        }
    }

    /// Observable state without side effects
    pub fn state(&self) -> BreakerState {
        if self.failures.load(Ordering::Acquire) < self.config.failure_threshold {
            return BreakerState::Closed;
        }

        match self.lock_window().until {
            Some(until) if self.clock.now() < until => BreakerState::Open,
            _ => BreakerState::Closed,
        }
    }

    /// Forget all recorded failures
    pub fn reset(&self) {
        let mut window = self.lock_window();
        self.failures.store(0, Ordering::Release);
        *window = BackoffWindow::default();
    }
}
