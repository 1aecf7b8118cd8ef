//! # Booking Testing
//!
//! In-memory backends, collaborator mocks and fixtures for the booking crates.
//!
//! This crate provides:
//! - [`InMemoryAvailabilityStore`] and [`InMemoryReservationLedger`]: also the
//!   `memory` storage backend of the service
//! - [`MockAccommodationDirectory`] and [`RecordingNotificationGateway`]
//! - [`FixedClock`] for deterministic time
//! - [`fixtures`]: builders for periods, reservations and listings
//!
//! ## Example
//!
//! ```
//! use booking_testing::{InMemoryReservationLedger, test_clock};
//! use booking_core::environment::Clock;
//! use booking_core::overlap::OverlapChecker;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let clock = test_clock();
//! let checker = OverlapChecker::new(Arc::new(InMemoryReservationLedger::new()));
//!
//! let free = checker
//!     .is_available(Default::default(), clock.now(), clock.now() + chrono::Duration::days(2))
//!     .await?;
//! assert!(free);
//! # Ok(())
//! # }
//! ```

use booking_core::environment::Clock;
use chrono::{DateTime, Utc};

pub mod collaborators;
pub mod fixtures;
pub mod memory;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use booking_testing::mocks::FixedClock;
    /// use booking_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Default fixed clock for tests: 2024-01-01 00:00:00 UTC, the morning
    /// before the fixture stays begin.
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(crate::fixtures::day(1))
    }
}

// Re-export commonly used items
pub use collaborators::{MockAccommodationDirectory, RecordingNotificationGateway};
pub use memory::{InMemoryAvailabilityStore, InMemoryReservationLedger, linked_backends};
pub use mocks::{FixedClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
        assert_eq!(time1, fixtures::day(1));
    }
}
