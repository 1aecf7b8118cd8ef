//! # Booking Runtime
//!
//! Resilience and observability plumbing shared by the booking service.
//!
//! ## Core Components
//!
//! - **Circuit breaker**: isolates the accommodation and notification
//!   collaborators, with per-call timeouts and failure classification
//! - **Retry**: exponential backoff for transient failures
//! - **Dispatcher**: bounded background queue that redelivers notifications
//! - **Metrics**: Prometheus recorder and per-component recorders
//! - **Health**: readiness report combining storage and breaker state

/// Circuit breaker pattern for isolating failing collaborators
pub mod circuit_breaker;

/// Background notification redelivery
pub mod dispatcher;

/// Readiness reporting
pub mod health;

/// Prometheus metrics for observability
pub mod metrics;

/// Retry logic with exponential backoff
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, State};
pub use dispatcher::{DispatcherConfig, DispatcherWorker, NotificationDispatcher};
pub use health::{HealthCheck, HealthReport, HealthStatus};
pub use retry::RetryPolicy;
