//! Error taxonomy shared by every booking layer.

use thiserror::Error;

/// Result alias used throughout the booking crates.
pub type Result<T, E = BookingError> = std::result::Result<T, E>;

/// Everything that can go wrong while managing periods and reservations.
///
/// Each variant carries a stable machine-readable [`code`](Self::code) that
/// the HTTP layer surfaces to clients.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// Malformed input: inverted dates, zero guests, non-positive duration.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The requested record does not exist (or is not visible to the caller).
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request collides with existing state, usually an overlapping reservation.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The requested dates fall outside the parent availability period.
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// The caller does not own the resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The reservation has already started and can no longer be cancelled.
    #[error("Reservation is active: {0}")]
    ActiveReservation(String),

    /// A collaborator could not be reached or its breaker is open.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Storage backend failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl BookingError {
    /// Stable error code for API consumers.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::OutOfRange(_) => "OUT_OF_RANGE",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::ActiveReservation(_) => "ACTIVE_RESERVATION",
            Self::UpstreamUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Storage(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Shorthand for a [`NotFound`](Self::NotFound) naming the resource.
    #[must_use]
    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{resource} {id} not found"))
    }
}
