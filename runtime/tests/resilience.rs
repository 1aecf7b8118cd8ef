//! Retry and circuit breaker working together, as the notification path uses them.

#![allow(clippy::unwrap_used)]

use booking_runtime::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError};
use booking_runtime::retry::{RetryPolicy, retry_with_predicate};
use booking_runtime::{HealthCheck, HealthStatus, State};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[tokio::test]
async fn retries_stop_once_the_breaker_opens() {
    init_tracing();

    let breaker = CircuitBreaker::new(
        "notification",
        CircuitBreakerConfig::builder()
            .failure_threshold(3)
            .cool_down(Duration::from_secs(60))
            .build(),
    );
    let policy = RetryPolicy::builder()
        .max_retries(10)
        .initial_delay(Duration::from_millis(1))
        .build();
    let remote_calls = Arc::new(AtomicUsize::new(0));

    let result = retry_with_predicate(
        &policy,
        || {
            let breaker = breaker.clone();
            let remote_calls = Arc::clone(&remote_calls);
            async move {
                breaker
                    .call(|| async move {
                        remote_calls.fetch_add(1, Ordering::SeqCst);
                        Err::<(), _>("connection refused")
                    })
                    .await
            }
        },
        |err: &CircuitBreakerError<&'static str>| !matches!(err, CircuitBreakerError::Open(_)),
    )
    .await;

    assert!(matches!(result, Err(CircuitBreakerError::Open(_))));
    assert_eq!(remote_calls.load(Ordering::SeqCst), 3);
    assert_eq!(breaker.state().await, State::Open);

    let check = HealthCheck::from_breaker(&breaker).await;
    assert_eq!(check.status, HealthStatus::Degraded);
}

#[tokio::test]
async fn retry_rides_out_a_short_outage() {
    init_tracing();

    let breaker = CircuitBreaker::new(
        "accommodation",
        CircuitBreakerConfig::builder().failure_threshold(5).build(),
    );
    let policy = RetryPolicy::builder()
        .max_retries(3)
        .initial_delay(Duration::from_millis(1))
        .build();
    let attempts = Arc::new(AtomicUsize::new(0));

    let result = retry_with_predicate(
        &policy,
        || {
            let breaker = breaker.clone();
            let attempts = Arc::clone(&attempts);
            async move {
                breaker
                    .call(|| async move {
                        if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                            Err("503")
                        } else {
                            Ok("owner-1")
                        }
                    })
                    .await
            }
        },
        |err: &CircuitBreakerError<&'static str>| !matches!(err, CircuitBreakerError::Open(_)),
    )
    .await;

    assert_eq!(result.unwrap(), "owner-1");
    assert_eq!(breaker.state().await, State::Closed);
}
