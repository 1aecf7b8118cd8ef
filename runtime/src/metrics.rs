//! Prometheus metrics for the booking service.
//!
//! This module installs the Prometheus recorder and provides small recorder
//! structs for each component:
//! - Reservation ledger outcomes (created, conflicts, cancellations)
//! - Notification delivery (sent, deferred, dropped, exhausted)
//! - Circuit breaker state and calls, labelled by breaker name
//! - Retry attempts
//!
//! # Example
//!
//! ```rust,no_run
//! use booking_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // Expose `server.render()` on the metrics listener
//! # Ok(())
//! # }
//! ```

use crate::circuit_breaker::State;
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder plus the address its scrape endpoint is served on.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Socket address the scrape endpoint binds to (e.g., `0.0.0.0:9090`)
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Address the scrape endpoint should bind to.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Register metric descriptions and install the global recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g., by another test), this logs a
    /// warning and leaves `handle()` empty.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(
                    addr = %self.addr,
                    "Metrics recorder installed - scrape at http://{}/metrics",
                    self.addr
                );
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the recorder was not installed by this server.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Reservation ledger
    describe_counter!(
        "booking_reservations_created_total",
        "Reservations committed to the ledger"
    );
    describe_counter!(
        "booking_reservation_conflicts_total",
        "Reservation requests rejected because the dates overlap an existing booking"
    );
    describe_counter!(
        "booking_reservations_cancelled_total",
        "Reservations cancelled by guests"
    );
    describe_counter!(
        "booking_periods_created_total",
        "Availability periods created by hosts"
    );
    describe_histogram!(
        "booking_reservation_duration_seconds",
        "Time taken to validate and commit a reservation"
    );

    // Notifications
    describe_counter!(
        "booking_notifications_total",
        "Host notifications by outcome (sent, deferred, dropped, exhausted)"
    );
    describe_gauge!(
        "booking_notification_queue_depth",
        "Notifications waiting in the background dispatcher"
    );

    // Circuit Breaker Metrics
    describe_gauge!(
        "circuit_breaker_state",
        "Current circuit breaker state (0=closed, 1=half-open, 2=open)"
    );
    describe_counter!(
        "circuit_breaker_calls_total",
        "Total number of calls through circuit breaker"
    );
    describe_counter!(
        "circuit_breaker_successes_total",
        "Total number of successful calls"
    );
    describe_counter!(
        "circuit_breaker_failures_total",
        "Total number of failed calls"
    );
    describe_counter!(
        "circuit_breaker_rejections_total",
        "Total number of rejected calls (circuit open)"
    );

    // Retry Metrics
    describe_counter!("retry_attempts_total", "Total number of retry attempts");
    describe_counter!(
        "retry_successes_total",
        "Total number of operations that succeeded after retrying"
    );
    describe_counter!(
        "retry_exhausted_total",
        "Total number of operations that exhausted max retries"
    );
}

/// Reservation ledger metrics recorder.
pub struct BookingMetrics;

impl BookingMetrics {
    /// Record a committed reservation.
    pub fn record_reservation_created(duration: Duration) {
        counter!("booking_reservations_created_total").increment(1);
        histogram!("booking_reservation_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a reservation rejected for overlapping.
    pub fn record_conflict() {
        counter!("booking_reservation_conflicts_total").increment(1);
    }

    /// Record a cancellation.
    pub fn record_cancellation() {
        counter!("booking_reservations_cancelled_total").increment(1);
    }

    /// Record a new availability period.
    pub fn record_period_created() {
        counter!("booking_periods_created_total").increment(1);
    }
}

/// Notification delivery outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// Delivered on the request path
    Sent,
    /// Handed to the background dispatcher
    Deferred,
    /// Background queue was full
    Dropped,
    /// Background retries ran out
    Exhausted,
    /// Delivered by the background dispatcher
    Redelivered,
}

impl NotificationOutcome {
    const fn label(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Deferred => "deferred",
            Self::Dropped => "dropped",
            Self::Exhausted => "exhausted",
            Self::Redelivered => "redelivered",
        }
    }
}

/// Notification metrics recorder.
pub struct NotificationMetrics;

impl NotificationMetrics {
    /// Record a delivery outcome.
    pub fn record(outcome: NotificationOutcome) {
        counter!("booking_notifications_total", "outcome" => outcome.label()).increment(1);
    }

    /// Record the dispatcher backlog.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_queue_depth(depth: usize) {
        gauge!("booking_notification_queue_depth").set(depth as f64);
    }
}

/// Circuit breaker metrics recorder.
pub struct CircuitBreakerMetrics;

impl CircuitBreakerMetrics {
    /// Record circuit breaker state.
    pub fn record_state(breaker: &str, state: State) {
        gauge!("circuit_breaker_state", "breaker" => breaker.to_string()).set(state.as_gauge());
    }

    /// Record a call attempt.
    pub fn record_call(breaker: &str) {
        counter!("circuit_breaker_calls_total", "breaker" => breaker.to_string()).increment(1);
    }

    /// Record a successful call.
    pub fn record_success(breaker: &str) {
        counter!("circuit_breaker_successes_total", "breaker" => breaker.to_string()).increment(1);
    }

    /// Record a failed call.
    pub fn record_failure(breaker: &str) {
        counter!("circuit_breaker_failures_total", "breaker" => breaker.to_string()).increment(1);
    }

    /// Record a rejected call (circuit open).
    pub fn record_rejection(breaker: &str) {
        counter!("circuit_breaker_rejections_total", "breaker" => breaker.to_string())
            .increment(1);
    }
}

/// Retry metrics recorder.
pub struct RetryMetrics;

impl RetryMetrics {
    /// Record a retry attempt.
    pub fn record_attempt() {
        counter!("retry_attempts_total").increment(1);
    }

    /// Record a success after at least one retry.
    pub fn record_success() {
        counter!("retry_successes_total").increment(1);
    }

    /// Record exhausted retries.
    pub fn record_exhausted() {
        counter!("retry_exhausted_total").increment(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_server_creation() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let server = MetricsServer::new(addr);
        assert!(server.handle().is_none());
        assert_eq!(server.addr(), addr);
    }

    #[test]
    fn test_metrics_server_render() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let mut server = MetricsServer::new(addr);
        server.start().unwrap();

        BookingMetrics::record_reservation_created(Duration::from_millis(12));
        BookingMetrics::record_conflict();
        NotificationMetrics::record(NotificationOutcome::Deferred);
        CircuitBreakerMetrics::record_state("accommodation", State::Open);

        // Another test may have installed the recorder first
        if let Some(rendered) = server.render() {
            assert!(rendered.contains("booking_reservations_created_total"));
            assert!(rendered.contains("booking_reservation_conflicts_total"));
            assert!(rendered.contains("outcome=\"deferred\""));
            assert!(rendered.contains("breaker=\"accommodation\""));
        }
    }

    #[test]
    fn test_notification_outcome_labels() {
        assert_eq!(NotificationOutcome::Sent.label(), "sent");
        assert_eq!(NotificationOutcome::Dropped.label(), "dropped");
    }
}
