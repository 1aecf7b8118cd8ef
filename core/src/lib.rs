//! # Booking Core
//!
//! Domain types and rules for time-bounded rental availability.
//!
//! A host publishes **availability periods** for an accommodation (a priced
//! date window). Guests place **reservations** inside a period. The one rule
//! that matters above all others: two reservations on the same period never
//! overlap in time.
//!
//! ## Building Blocks
//!
//! - [`pricing`]: pure price computation from duration, unit price and guests
//! - [`overlap`]: half-open interval predicate and the ledger-backed
//!   [`OverlapChecker`](overlap::OverlapChecker)
//! - [`ports`]: storage and collaborator traits implemented by adapters
//!   (in-memory, `PostgreSQL`, HTTP)
//! - [`environment`]: injected clock
//! - [`error`]: the [`BookingError`] taxonomy shared by every layer
//!
//! ## Example
//!
//! ```
//! use booking_core::pricing::compute_price;
//! use chrono::{TimeZone, Utc};
//!
//! let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).single().ok_or("bad date")?;
//! let end = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).single().ok_or("bad date")?;
//!
//! // Three nights at 100 per night, flat rate
//! assert_eq!(compute_price(start, end, false, 100, 2)?, 300);
//! // Same stay, priced per guest
//! assert_eq!(compute_price(start, end, true, 100, 4)?, 1200);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

pub mod environment;
pub mod error;
pub mod overlap;
pub mod ports;
pub mod pricing;
pub mod types;

pub use error::{BookingError, Result};
pub use types::*;
