//! # Booking Service
//!
//! Availability and reservation HTTP service for short-term rentals.
//!
//! Hosts publish priced availability periods for their accommodations;
//! guests book stays inside them. Two reservations on the same period never
//! overlap.
//!
//! # Architecture
//!
//! ```text
//! HTTP (axum) ──► api handlers ──► BookingCoordinator
//!                                    │
//!             ┌──────────────────────┼──────────────────────┐
//!             ▼                      ▼                      ▼
//!     AvailabilityStore      ReservationLedger     Accommodation / Notification
//!     (memory | postgres)    (memory | postgres)   clients behind breakers
//!                                                           │
//!                                                  NotificationDispatcher
//!                                                  (background redelivery)
//! ```
//!
//! The binary in `main.rs` wires these together from [`Config`].

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod app;
pub mod clients;
pub mod config;
pub mod server;

pub use app::{BookingCoordinator, Dependencies, NotificationStatus, Notifier};
pub use config::{Config, ConfigError, StorageBackend};
pub use server::{build_router, AppState};
