//! Axum integration for the booking service.
//!
//! This crate holds the HTTP concerns that do not depend on routing:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          HTTP shell (this crate)        │  ← bearer tokens, correlation ids
//! │  - Caller extraction                    │  ← {code, message} error bodies
//! │  - Error → status mapping               │  ← liveness / readiness bodies
//! ├─────────────────────────────────────────┤
//! │       Booking core + coordinator        │
//! │  - Overlap, pricing, containment        │
//! │  - Storage and collaborator ports       │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use booking_web::{AppError, Caller, Role};
//!
//! async fn create(
//!     State(state): State<AppState>,
//!     caller: Caller,
//!     Json(request): Json<NewReservation>,
//! ) -> Result<(StatusCode, Json<Reservation>), AppError> {
//!     caller.require(Role::Guest)?;
//!     let reservation = state.coordinator.insert_reservation(&caller.user_id, request).await?;
//!     Ok((StatusCode::CREATED, Json(reservation)))
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod error;
pub mod extractors;
pub mod health;
pub mod middleware;

pub use auth::{AuthError, Caller, Claims, Role, TokenVerifier};
pub use error::AppError;
pub use extractors::CorrelationId;
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
