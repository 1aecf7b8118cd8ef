//! Circuit breaker pattern for isolating failing collaborators.
//!
//! A circuit breaker monitors calls to a remote service and "opens" (stops
//! sending requests) after consecutive failures, so a dead collaborator costs
//! a fast rejection instead of a hung request.
//!
//! # States
//!
//! - **Closed**: Normal operation. Calls pass through. Consecutive failures are counted.
//! - **Open**: Threshold reached. Calls are rejected until the cool-down elapses.
//! - **HalfOpen**: After the cool-down, at most `half_open_max_calls` trial calls
//!   run concurrently. `success_threshold` successes close the circuit; any
//!   failure re-opens it.
//!
//! # Failure classification
//!
//! Not every error means the remote is unhealthy. [`CircuitBreaker::call_classified`]
//! takes a predicate deciding which errors count; the rest are returned to the
//! caller but recorded as successes (a 404 from a healthy service is still a
//! healthy service). Timeouts always count.
//!
//! # Example
//!
//! ```rust
//! use booking_runtime::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CircuitBreakerConfig::builder()
//!     .failure_threshold(3)
//!     .cool_down(Duration::from_secs(10))
//!     .call_timeout(Duration::from_secs(2))
//!     .build();
//!
//! let breaker = CircuitBreaker::new("accommodation", config);
//!
//! match breaker.call(|| async {
//!     // Your fallible operation
//!     Ok::<_, String>(42)
//! }).await {
//!     Ok(result) => println!("Success: {result}"),
//!     Err(e) => println!("Failed: {e}"),
//! }
//! # Ok(())
//! # }
//! ```

use crate::metrics::CircuitBreakerMetrics as Recorder;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

/// Circuit breaker configuration.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// How long to stay Open before allowing trial calls
    pub cool_down: Duration,
    /// Successful trials in `HalfOpen` needed to close the circuit
    pub success_threshold: u32,
    /// Concurrent trial calls allowed in `HalfOpen`
    pub half_open_max_calls: u32,
    /// Deadline applied to every call, if any
    pub call_timeout: Option<Duration>,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl CircuitBreakerConfig {
    /// Create a new configuration builder.
    ///
    /// Defaults: 3 failures, 10 s cool-down, 1 trial call, 1 success to close,
    /// no call timeout.
    #[must_use]
    pub const fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder {
            failure_threshold: 3,
            cool_down: Duration::from_secs(10),
            success_threshold: 1,
            half_open_max_calls: 1,
            call_timeout: None,
        }
    }
}

/// Builder for [`CircuitBreakerConfig`].
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfigBuilder {
    failure_threshold: u32,
    cool_down: Duration,
    success_threshold: u32,
    half_open_max_calls: u32,
    call_timeout: Option<Duration>,
}

impl CircuitBreakerConfigBuilder {
    /// Circuit opens after this many consecutive failures.
    #[must_use]
    pub const fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// How long to wait in Open state before trying `HalfOpen`.
    #[must_use]
    pub const fn cool_down(mut self, duration: Duration) -> Self {
        self.cool_down = duration;
        self
    }

    /// Number of successes in `HalfOpen` state before closing the circuit.
    #[must_use]
    pub const fn success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold;
        self
    }

    /// Concurrent trial calls admitted in `HalfOpen`.
    #[must_use]
    pub const fn half_open_max_calls(mut self, calls: u32) -> Self {
        self.half_open_max_calls = calls;
        self
    }

    /// Deadline for each call. Expiry counts as a failure.
    #[must_use]
    pub const fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Build the configuration. Zero thresholds are raised to one.
    #[must_use]
    pub fn build(self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold.max(1),
            cool_down: self.cool_down,
            success_threshold: self.success_threshold.max(1),
            half_open_max_calls: self.half_open_max_calls.max(1),
            call_timeout: self.call_timeout,
        }
    }
}

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Circuit is closed, requests pass through normally
    Closed,
    /// Circuit is open, requests fail immediately
    Open,
    /// Circuit is half-open, testing if service recovered
    HalfOpen,
}

impl State {
    /// Gauge encoding: 0 = closed, 1 = half-open, 2 = open.
    #[must_use]
    pub const fn as_gauge(self) -> f64 {
        match self {
            Self::Closed => 0.0,
            Self::HalfOpen => 1.0,
            Self::Open => 2.0,
        }
    }
}

/// Errors from circuit breaker operations.
#[derive(Error, Debug)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open (or half-open with all trial slots taken), request rejected
    #[error("Circuit breaker '{0}' is open")]
    Open(String),
    /// Operation exceeded the call timeout
    #[error("Circuit breaker '{name}': call timed out after {after:?}")]
    Timeout {
        /// Breaker name
        name: String,
        /// Configured deadline
        after: Duration,
    },
    /// Operation failed
    #[error("Operation failed: {0}")]
    Inner(E),
}

/// Internal state of the circuit breaker.
#[derive(Debug)]
struct CircuitBreakerState {
    state: State,
    consecutive_failures: u32,
    half_open_successes: u32,
    opened_at: Option<Instant>,
}

/// Holds a half-open trial slot; released on drop so a cancelled call
/// cannot leak the slot.
struct TrialPermit(Arc<AtomicU32>);

/// Why a call was let through.
enum Admission {
    Closed,
    Trial(#[allow(dead_code)] TrialPermit),
}

impl Drop for TrialPermit {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Circuit breaker for isolating a remote collaborator.
///
/// Cloning shares state: every clone observes and drives the same circuit.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    name: Arc<str>,
    config: Arc<CircuitBreakerConfig>,
    state: Arc<RwLock<CircuitBreakerState>>,
    trials_in_flight: Arc<AtomicU32>,
    // Metrics
    total_calls: Arc<AtomicU64>,
    total_successes: Arc<AtomicU64>,
    total_failures: Arc<AtomicU64>,
    total_rejections: Arc<AtomicU64>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker. `name` labels logs and metrics.
    #[must_use]
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name: String = name.into();
        Recorder::record_state(&name, State::Closed);
        Self {
            name: name.into(),
            config: Arc::new(config),
            state: Arc::new(RwLock::new(CircuitBreakerState {
                state: State::Closed,
                consecutive_failures: 0,
                half_open_successes: 0,
                opened_at: None,
            })),
            trials_in_flight: Arc::new(AtomicU32::new(0)),
            total_calls: Arc::new(AtomicU64::new(0)),
            total_successes: Arc::new(AtomicU64::new(0)),
            total_failures: Arc::new(AtomicU64::new(0)),
            total_rejections: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Breaker name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the current state of the circuit breaker.
    ///
    /// An Open circuit whose cool-down has elapsed still reports `Open` until
    /// the next call moves it to `HalfOpen`.
    pub async fn state(&self) -> State {
        let state = self.state.read().await;
        state.state
    }

    /// Call an operation through the circuit breaker. Every error counts as a failure.
    ///
    /// # Errors
    ///
    /// - `CircuitBreakerError::Open` if the circuit rejects the call
    /// - `CircuitBreakerError::Timeout` if the call timeout elapses
    /// - `CircuitBreakerError::Inner` if the operation fails
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        self.call_classified(operation, |_| true).await
    }

    /// Call an operation, counting only errors for which `is_failure` returns
    /// `true` against the circuit.
    ///
    /// # Errors
    ///
    /// - `CircuitBreakerError::Open` if the circuit rejects the call
    /// - `CircuitBreakerError::Timeout` if the call timeout elapses
    /// - `CircuitBreakerError::Inner` if the operation fails (whether or not it counted)
    pub async fn call_classified<F, Fut, T, E, P>(
        &self,
        operation: F,
        is_failure: P,
    ) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        P: FnOnce(&E) -> bool,
    {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        Recorder::record_call(&self.name);

        let Some(admission) = self.try_acquire().await else {
            self.total_rejections.fetch_add(1, Ordering::Relaxed);
            Recorder::record_rejection(&self.name);
            tracing::warn!(breaker = %self.name, "Circuit breaker is OPEN, rejecting request");
            return Err(CircuitBreakerError::Open(self.name.to_string()));
        };

        let outcome = match self.config.call_timeout {
            Some(deadline) => match tokio::time::timeout(deadline, operation()).await {
                Ok(result) => result.map_err(CircuitBreakerError::Inner),
                Err(_) => Err(CircuitBreakerError::Timeout {
                    name: self.name.to_string(),
                    after: deadline,
                }),
            },
            None => operation().await.map_err(CircuitBreakerError::Inner),
        };

        let counts_as_failure = match &outcome {
            Ok(_) => false,
            Err(CircuitBreakerError::Inner(err)) => is_failure(err),
            Err(_) => true,
        };

        if counts_as_failure {
            self.on_failure(&admission).await;
            self.total_failures.fetch_add(1, Ordering::Relaxed);
            Recorder::record_failure(&self.name);
        } else {
            self.on_success(&admission).await;
            self.total_successes.fetch_add(1, Ordering::Relaxed);
            Recorder::record_success(&self.name);
        }

        outcome
    }

    /// Decide whether a call may proceed. `None` rejects it.
    async fn try_acquire(&self) -> Option<Admission> {
        let mut state = self.state.write().await;

        if state.state == State::Open {
            let cooled = state
                .opened_at
                .is_some_and(|opened| opened.elapsed() >= self.config.cool_down);
            if !cooled {
                return None;
            }
            tracing::info!(breaker = %self.name, "Circuit breaker transitioning OPEN -> HALF_OPEN");
            self.transition(&mut state, State::HalfOpen);
            state.half_open_successes = 0;
        }

        match state.state {
            State::Closed => Some(Admission::Closed),
            State::HalfOpen => {
                if self.trials_in_flight.load(Ordering::Acquire) >= self.config.half_open_max_calls
                {
                    return None;
                }
                self.trials_in_flight.fetch_add(1, Ordering::AcqRel);
                Some(Admission::Trial(TrialPermit(Arc::clone(
                    &self.trials_in_flight,
                ))))
            }
            State::Open => None,
        }
    }

    /// Handle successful operation.
    async fn on_success(&self, admission: &Admission) {
        let mut state = self.state.write().await;

        match state.state {
            State::Closed => {
                state.consecutive_failures = 0;
            }
            // Only trials admitted while half-open may close the circuit
            State::HalfOpen if matches!(admission, Admission::Closed) => {}
            State::HalfOpen => {
                state.half_open_successes += 1;
                if state.half_open_successes >= self.config.success_threshold {
                    tracing::info!(
                        breaker = %self.name,
                        successes = state.half_open_successes,
                        "Circuit breaker transitioning HALF_OPEN -> CLOSED"
                    );
                    self.transition(&mut state, State::Closed);
                    state.consecutive_failures = 0;
                    state.half_open_successes = 0;
                    state.opened_at = None;
                }
            }
            // A call admitted before another trial re-opened the circuit
            State::Open => {}
        }
    }

    /// Handle failed operation.
    async fn on_failure(&self, admission: &Admission) {
        let mut state = self.state.write().await;

        match state.state {
            State::Closed => {
                state.consecutive_failures += 1;
                if state.consecutive_failures >= self.config.failure_threshold {
                    tracing::warn!(
                        breaker = %self.name,
                        failures = state.consecutive_failures,
                        threshold = self.config.failure_threshold,
                        "Circuit breaker transitioning CLOSED -> OPEN"
                    );
                    self.transition(&mut state, State::Open);
                    state.opened_at = Some(Instant::now());
                }
            }
            State::HalfOpen if matches!(admission, Admission::Closed) => {}
            State::HalfOpen => {
                tracing::warn!(
                    breaker = %self.name,
                    "Circuit breaker transitioning HALF_OPEN -> OPEN (recovery failed)"
                );
                self.transition(&mut state, State::Open);
                state.opened_at = Some(Instant::now());
                state.half_open_successes = 0;
            }
            State::Open => {
                state.consecutive_failures += 1;
            }
        }
    }

    fn transition(&self, state: &mut CircuitBreakerState, to: State) {
        state.state = to;
        Recorder::record_state(&self.name, to);
    }

    /// Get circuit breaker counters.
    #[must_use]
    pub fn metrics(&self) -> CircuitBreakerStats {
        CircuitBreakerStats {
            total_calls: self.total_calls.load(Ordering::Relaxed),
            total_successes: self.total_successes.load(Ordering::Relaxed),
            total_failures: self.total_failures.load(Ordering::Relaxed),
            total_rejections: self.total_rejections.load(Ordering::Relaxed),
        }
    }

    /// Reset the circuit breaker to closed state.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        tracing::info!(breaker = %self.name, "Circuit breaker manually reset to CLOSED");
        self.transition(&mut state, State::Closed);
        state.consecutive_failures = 0;
        state.half_open_successes = 0;
        state.opened_at = None;
    }
}

/// Counters for circuit breaker monitoring.
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerStats {
    /// Total number of calls attempted
    pub total_calls: u64,
    /// Total number of calls recorded as successes
    pub total_successes: u64,
    /// Total number of calls recorded as failures
    pub total_failures: u64,
    /// Total number of rejected calls (circuit open)
    pub total_rejections: u64,
}

impl CircuitBreakerStats {
    /// Calculate success rate (0.0 to 1.0).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.total_calls == 0 {
            return 1.0;
        }
        self.total_successes as f64 / self.total_calls as f64
    }

    /// Calculate rejection rate (0.0 to 1.0).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rejection_rate(&self) -> f64 {
        if self.total_calls == 0 {
            return 0.0;
        }
        self.total_rejections as f64 / self.total_calls as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, cool_down_ms: u64) -> CircuitBreaker {
        CircuitBreaker::new(
            "test",
            CircuitBreakerConfig::builder()
                .failure_threshold(threshold)
                .cool_down(Duration::from_millis(cool_down_ms))
                .build(),
        )
    }

    async fn fail(breaker: &CircuitBreaker, times: usize) {
        for _ in 0..times {
            let _ = breaker.call(|| async { Err::<i32, _>("error") }).await;
        }
    }

    #[tokio::test]
    async fn test_closed_on_success() {
        let breaker = CircuitBreaker::new("test", CircuitBreakerConfig::default());

        let result = breaker.call(|| async { Ok::<_, String>(42) }).await;

        assert!(matches!(result, Ok(42)));
        assert_eq!(breaker.state().await, State::Closed);
    }

    #[tokio::test]
    async fn test_stays_closed_below_threshold() {
        let breaker = breaker(3, 1_000);
        fail(&breaker, 2).await;
        assert_eq!(breaker.state().await, State::Closed);
    }

    #[tokio::test]
    async fn test_success_resets_consecutive_failures() {
        let breaker = breaker(3, 1_000);
        fail(&breaker, 2).await;
        let _ = breaker.call(|| async { Ok::<_, String>(1) }).await;
        fail(&breaker, 2).await;
        assert_eq!(breaker.state().await, State::Closed);
    }

    #[tokio::test]
    async fn test_opens_after_threshold_and_rejects() {
        let breaker = breaker(3, 1_000);
        fail(&breaker, 3).await;

        assert_eq!(breaker.state().await, State::Open);

        let result = breaker.call(|| async { Ok::<_, String>(42) }).await;
        assert!(matches!(result, Err(CircuitBreakerError::Open(ref name)) if name == "test"));
        assert_eq!(breaker.metrics().total_rejections, 1);
    }

    #[tokio::test]
    async fn test_non_failures_do_not_trip() {
        let breaker = breaker(2, 1_000);

        for _ in 0..5 {
            let result = breaker
                .call_classified(|| async { Err::<i32, u16>(404) }, |status| *status >= 500)
                .await;
            assert!(matches!(result, Err(CircuitBreakerError::Inner(404))));
        }

        assert_eq!(breaker.state().await, State::Closed);
        assert_eq!(breaker.metrics().total_successes, 5);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let breaker = CircuitBreaker::new(
            "slow",
            CircuitBreakerConfig::builder()
                .failure_threshold(1)
                .call_timeout(Duration::from_millis(20))
                .build(),
        );

        let result = breaker
            .call(|| async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok::<_, String>(1)
            })
            .await;

        assert!(matches!(result, Err(CircuitBreakerError::Timeout { .. })));
        assert_eq!(breaker.state().await, State::Open);
    }

    #[tokio::test]
    async fn test_half_open_closes_after_success() {
        let breaker = breaker(2, 50);
        fail(&breaker, 2).await;

        tokio::time::sleep(Duration::from_millis(80)).await;

        let result = breaker.call(|| async { Ok::<_, String>(42) }).await;
        assert!(result.is_ok());
        assert_eq!(breaker.state().await, State::Closed);
    }

    #[tokio::test]
    async fn test_half_open_requires_success_threshold() {
        let breaker = CircuitBreaker::new(
            "test",
            CircuitBreakerConfig::builder()
                .failure_threshold(1)
                .cool_down(Duration::from_millis(50))
                .success_threshold(2)
                .build(),
        );
        fail(&breaker, 1).await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        let _ = breaker.call(|| async { Ok::<_, String>(1) }).await;
        assert_eq!(breaker.state().await, State::HalfOpen);

        let _ = breaker.call(|| async { Ok::<_, String>(1) }).await;
        assert_eq!(breaker.state().await, State::Closed);
    }

    #[tokio::test]
    async fn test_reopens_on_half_open_failure() {
        let breaker = breaker(2, 50);
        fail(&breaker, 2).await;

        tokio::time::sleep(Duration::from_millis(80)).await;

        fail(&breaker, 1).await;
        assert_eq!(breaker.state().await, State::Open);

        // Cool-down restarts from the failed trial
        let result = breaker.call(|| async { Ok::<_, String>(42) }).await;
        assert!(matches!(result, Err(CircuitBreakerError::Open(_))));
    }

    #[tokio::test]
    async fn test_half_open_admits_limited_trials() {
        let breaker = breaker(1, 50);
        fail(&breaker, 1).await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        let (release, wait) = tokio::sync::oneshot::channel::<()>();
        let trial = {
            let breaker = breaker.clone();
            tokio::spawn(async move {
                breaker
                    .call(|| async move {
                        let _ = wait.await;
                        Ok::<_, String>(1)
                    })
                    .await
            })
        };

        // Let the trial acquire its slot
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = breaker.call(|| async { Ok::<_, String>(2) }).await;
        assert!(matches!(second, Err(CircuitBreakerError::Open(_))));

        let _ = release.send(());
        let first = trial.await.ok();
        assert!(matches!(first, Some(Ok(1))));
        assert_eq!(breaker.state().await, State::Closed);
    }

    #[tokio::test]
    async fn test_cancelled_trial_releases_slot() {
        let breaker = breaker(1, 50);
        fail(&breaker, 1).await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        let stuck = {
            let breaker = breaker.clone();
            tokio::spawn(async move {
                breaker
                    .call(|| async {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        Ok::<_, String>(0)
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        stuck.abort();
        let _ = stuck.await;

        let result = breaker.call(|| async { Ok::<_, String>(7) }).await;
        assert!(matches!(result, Ok(7)));
    }

    #[tokio::test]
    async fn test_stale_call_does_not_settle_half_open() {
        let breaker = breaker(2, 50);

        // Admitted while Closed, finishes after the circuit has moved on
        let (release_stale, stale_wait) = tokio::sync::oneshot::channel::<()>();
        let stale = {
            let breaker = breaker.clone();
            tokio::spawn(async move {
                breaker
                    .call(|| async move {
                        let _ = stale_wait.await;
                        Ok::<_, String>(0)
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        fail(&breaker, 2).await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        let (release_trial, trial_wait) = tokio::sync::oneshot::channel::<()>();
        let trial = {
            let breaker = breaker.clone();
            tokio::spawn(async move {
                breaker
                    .call(|| async move {
                        let _ = trial_wait.await;
                        Ok::<_, String>(1)
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(breaker.state().await, State::HalfOpen);

        let _ = release_stale.send(());
        assert!(matches!(stale.await.ok(), Some(Ok(0))));
        assert_eq!(breaker.state().await, State::HalfOpen);

        let _ = release_trial.send(());
        assert!(matches!(trial.await.ok(), Some(Ok(1))));
        assert_eq!(breaker.state().await, State::Closed);
    }

    #[tokio::test]
    async fn test_reset() {
        let breaker = breaker(2, 10_000);
        fail(&breaker, 2).await;
        assert_eq!(breaker.state().await, State::Open);

        breaker.reset().await;

        assert_eq!(breaker.state().await, State::Closed);
    }

    #[tokio::test]
    async fn test_stats() {
        let breaker = breaker(10, 1_000);

        for _ in 0..3 {
            let _ = breaker.call(|| async { Ok::<_, String>(42) }).await;
        }
        fail(&breaker, 2).await;

        let stats = breaker.metrics();
        assert_eq!(stats.total_calls, 5);
        assert_eq!(stats.total_successes, 3);
        assert_eq!(stats.total_failures, 2);
        assert!((stats.success_rate() - 0.6).abs() < f64::EPSILON);
    }
}
