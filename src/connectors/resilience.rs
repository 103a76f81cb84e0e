//! Resilience primitives shared by all connectors.
//!
//! A stateless retry policy computing exponential backoff delays, and a
//! three-state circuit breaker guarding repeated calls to a failing source.
//! Neither primitive ever fails; the breaker converts failure to state.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::{CircuitConfig, RetryConfig};

/// Immutable retry strategy. Shared freely between connectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub exponential_base: f64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            exponential_base: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            exponential_base: config.exponential_base,
            jitter: config.jitter,
        }
    }

    /// Delay before the k-th retry (0-based): min(d0 * b^k, d_max), with an
    /// optional uniform jitter factor in [0.9, 1.1]. Negative k yields zero.
    pub fn delay(&self, attempt: i32) -> Duration {
        if attempt < 0 {
            return Duration::ZERO;
        }

        let raw = self.initial_delay.as_secs_f64() * self.exponential_base.powi(attempt);
        let mut delay = raw.min(self.max_delay.as_secs_f64());

        if self.jitter {
            let factor = rand::thread_rng().gen_range(0.9..=1.1);
            delay *= factor;
        }

        Duration::from_secs_f64(delay)
    }
}

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation
    Closed,
    /// Failing, reject requests
    Open,
    /// Testing whether the source recovered
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => f.write_str("closed"),
            CircuitState::Open => f.write_str("open"),
            CircuitState::HalfOpen => f.write_str("half_open"),
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit trips
    pub failure_threshold: u32,
    /// How long an open circuit waits before a half-open probe
    pub recovery_timeout: Duration,
    /// Consecutive half-open successes before the circuit closes
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            success_threshold: 2,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn from_config(config: &CircuitConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold,
            recovery_timeout: Duration::from_secs(config.recovery_timeout_seconds),
            success_threshold: config.success_threshold,
        }
    }
}

#[derive(Debug)]
struct CircuitInner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure: Option<Instant>,
    last_failure_at: Option<DateTime<Utc>>,
    last_success_at: Option<DateTime<Utc>>,
    last_state_change: DateTime<Utc>,
}

/// Point-in-time view of a breaker, exposed by the connector status endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub failure_count: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_state_change: DateTime<Utc>,
}

/// Three-state gate preventing repeated calls to a failing source.
///
/// All transition bookkeeping lives behind one mutex; state transitions are
/// decided inside the critical section so concurrent callers cannot lose
/// updates.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<CircuitInner>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(CircuitInner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure: None,
                last_failure_at: None,
                last_success_at: None,
                last_state_change: Utc::now(),
            }),
        }
    }

    /// Record a successful operation.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker lock poisoned");
        inner.last_success_at = Some(Utc::now());

        match inner.state {
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.config.success_threshold {
                    Self::set_state(&mut inner, CircuitState::Closed);
                }
            }
            CircuitState::Closed => {
                inner.failure_count = 0;
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed operation.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker lock poisoned");
        inner.failure_count += 1;
        inner.last_failure = Some(Instant::now());
        inner.last_failure_at = Some(Utc::now());

        match inner.state {
            CircuitState::Closed => {
                if inner.failure_count >= self.config.failure_threshold {
                    Self::set_state(&mut inner, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                Self::set_state(&mut inner, CircuitState::Open);
            }
            CircuitState::Open => {}
        }
    }

    /// Check whether a request may be executed. In the open state this also
    /// performs the open → half-open recovery check.
    pub fn can_execute(&self) -> bool {
        let mut inner = self.inner.lock().expect("circuit breaker lock poisoned");

        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure
                    .map(|instant| instant.elapsed())
                    .unwrap_or(Duration::MAX);
                if elapsed > self.config.recovery_timeout {
                    Self::set_state(&mut inner, CircuitState::HalfOpen);
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner
            .lock()
            .expect("circuit breaker lock poisoned")
            .state
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let inner = self.inner.lock().expect("circuit breaker lock poisoned");
        CircuitSnapshot {
            state: inner.state,
            failure_count: inner.failure_count,
            last_failure_at: inner.last_failure_at,
            last_success_at: inner.last_success_at,
            last_state_change: inner.last_state_change,
        }
    }

    fn set_state(inner: &mut CircuitInner, next: CircuitState) {
        if inner.state == next {
            return;
        }

        match next {
            CircuitState::Closed => {
                tracing::info!(from = %inner.state, "Circuit breaker transitioning to closed");
                inner.failure_count = 0;
                inner.success_count = 0;
            }
            CircuitState::Open => {
                tracing::warn!(from = %inner.state, "Circuit breaker transitioning to open");
                inner.success_count = 0;
            }
            CircuitState::HalfOpen => {
                tracing::info!(from = %inner.state, "Circuit breaker transitioning to half_open");
                inner.failure_count = 0;
                inner.success_count = 0;
            }
        }

        inner.state = next;
        inner.last_state_change = Utc::now();
    }
}
