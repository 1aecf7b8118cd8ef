//! Overlap detection between reservations on the same availability period.
//!
//! Intervals are half-open: `[start, end)`. One stay ending on the instant
//! the next begins is not a conflict.

use crate::error::Result;
use crate::ports::ReservationLedger;
use crate::types::{AvailabilityPeriodId, Reservation};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// `true` when `[a_start, a_end)` and `[b_start, b_end)` share an instant.
///
/// # Examples
///
/// ```
/// use booking_core::overlap::ranges_overlap;
///
/// assert!(ranges_overlap(1, 4, 3, 5));
/// assert!(!ranges_overlap(1, 3, 3, 5));
/// ```
#[must_use]
pub fn ranges_overlap<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start < b_end && b_start < a_end
}

/// First reservation in `existing` that intersects `[start, end)`.
#[must_use]
pub fn first_conflict<'a>(
    existing: impl IntoIterator<Item = &'a Reservation>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Option<&'a Reservation> {
    existing
        .into_iter()
        .find(|r| ranges_overlap(r.start_date, r.end_date, start, end))
}

/// Answers "is this date range free?" against the ledger's date-range index.
///
/// The answer is advisory: a concurrent writer can take the range between
/// the check and the insert. [`ReservationLedger::insert`] re-checks at
/// commit and is the authority.
#[derive(Clone)]
pub struct OverlapChecker {
    ledger: Arc<dyn ReservationLedger>,
}

impl OverlapChecker {
    /// Check against `ledger`.
    #[must_use]
    pub fn new(ledger: Arc<dyn ReservationLedger>) -> Self {
        Self { ledger }
    }

    /// `true` iff no reservation under `period_id` intersects `[start, end)`.
    ///
    /// # Errors
    ///
    /// Propagates ledger failures.
    pub async fn is_available(
        &self,
        period_id: AvailabilityPeriodId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool> {
        let overlapping = self.ledger.find_overlapping(period_id, start, end).await?;
        Ok(overlapping.is_empty())
    }
}

impl std::fmt::Debug for OverlapChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlapChecker").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{AccommodationId, ReservationId, UserId};
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn booked(start: u32, end: u32) -> Reservation {
        Reservation {
            id: ReservationId::new(),
            availability_period_id: AvailabilityPeriodId::new(),
            accommodation_id: AccommodationId::new("acc"),
            host_id: UserId::new("host"),
            guest_id: UserId::new("guest"),
            start_date: day(start),
            end_date: day(end),
            guest_count: 1,
            price: 0,
        }
    }

    #[test]
    fn touching_ranges_do_not_overlap() {
        assert!(!ranges_overlap(day(2), day(4), day(4), day(6)));
        assert!(!ranges_overlap(day(4), day(6), day(2), day(4)));
    }

    #[test]
    fn nested_and_partial_ranges_overlap() {
        assert!(ranges_overlap(day(2), day(8), day(3), day(4)));
        assert!(ranges_overlap(day(2), day(4), day(3), day(5)));
        assert!(ranges_overlap(day(3), day(5), day(2), day(4)));
    }

    #[test]
    fn first_conflict_skips_free_slots() {
        let existing = vec![booked(2, 4), booked(6, 8)];
        assert!(first_conflict(&existing, day(4), day(6)).is_none());
        let hit = first_conflict(&existing, day(7), day(9)).unwrap();
        assert_eq!(hit.start_date, day(6));
    }

    proptest! {
        #[test]
        fn overlap_is_symmetric(a in 0i64..100, la in 1i64..20, b in 0i64..100, lb in 1i64..20) {
            prop_assert_eq!(
                ranges_overlap(a, a + la, b, b + lb),
                ranges_overlap(b, b + lb, a, a + la)
            );
        }

        #[test]
        fn adjacent_ranges_never_overlap(a in 0i64..100, la in 1i64..20, lb in 1i64..20) {
            let b = a + la;
            prop_assert!(!ranges_overlap(a, b, b, b + lb));
        }

        #[test]
        fn range_overlaps_itself(a in 0i64..100, la in 1i64..20) {
            prop_assert!(ranges_overlap(a, a + la, a, a + la));
        }
    }
}
