//! Application state for the booking HTTP server.

use crate::app::BookingCoordinator;
use axum::extract::FromRef;
use booking_runtime::CircuitBreaker;
use booking_web::TokenVerifier;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply via Arc) for each request.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Booking operations
    pub coordinator: Arc<BookingCoordinator>,

    /// Bearer token verification
    pub verifier: Arc<TokenVerifier>,

    /// Collaborator breakers, reported by the readiness probe
    pub breakers: Arc<Vec<CircuitBreaker>>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        coordinator: Arc<BookingCoordinator>,
        verifier: Arc<TokenVerifier>,
        breakers: Vec<CircuitBreaker>,
    ) -> Self {
        Self {
            coordinator,
            verifier,
            breakers: Arc::new(breakers),
        }
    }
}

// Lets the `Caller` extractor find the verifier.
impl FromRef<AppState> for Arc<TokenVerifier> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.verifier)
    }
}
