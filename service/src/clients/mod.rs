//! HTTP clients for the accommodation and notification services.
//!
//! Each client owns a [`CircuitBreaker`](booking_runtime::CircuitBreaker).
//! Transport errors, timeouts and 5xx answers count against it; 4xx answers
//! are the caller's problem and do not.

mod accommodation;
mod notification;

pub use accommodation::HttpAccommodationDirectory;
pub use notification::HttpNotificationGateway;

use booking_core::BookingError;
use booking_runtime::CircuitBreakerError;
use thiserror::Error;

/// Failure talking to a collaborator.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Connection, TLS or body read failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with an unexpected status.
    #[error("unexpected status {status} from {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Request URL
        url: String,
    },
}

impl ClientError {
    /// 4xx answers do not indicate an unhealthy collaborator.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Status { status, .. } if (400..500).contains(status))
    }

    /// Whether this error should count against the breaker.
    fn trips_breaker(&self) -> bool {
        !self.is_client_error()
    }
}

/// Collapse a breaker outcome into the domain error.
fn upstream_error(service: &str, err: CircuitBreakerError<ClientError>) -> BookingError {
    match err {
        CircuitBreakerError::Open(_) => {
            BookingError::UpstreamUnavailable(format!("{service} circuit is open"))
        }
        CircuitBreakerError::Timeout { after, .. } => {
            BookingError::UpstreamUnavailable(format!("{service} timed out after {after:?}"))
        }
        CircuitBreakerError::Inner(inner) => {
            BookingError::UpstreamUnavailable(format!("{service}: {inner}"))
        }
    }
}
