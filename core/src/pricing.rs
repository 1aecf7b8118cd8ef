//! Reservation pricing.
//!
//! A stay is charged per whole day: `floor(hours / 24)`. Partial days are
//! free, so a stay shorter than 24 hours cannot be priced and is rejected.

use crate::error::{BookingError, Result};
use chrono::{DateTime, Utc};

/// Number of whole days between `start` and `end`.
#[must_use]
pub fn duration_days(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_hours() / 24
}

/// Price of a stay.
///
/// `days × unit_price`, multiplied by `guest_count` when the period is
/// priced per guest.
///
/// # Errors
///
/// Returns [`BookingError::Validation`] if the stay is shorter than one whole
/// day or the total does not fit in an `i64`.
pub fn compute_price(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    is_price_per_guest: bool,
    unit_price: i64,
    guest_count: u32,
) -> Result<i64> {
    let days = duration_days(start, end);
    if days <= 0 {
        return Err(BookingError::Validation(format!(
            "stay from {start} to {end} must last at least one day"
        )));
    }

    let multiplier = if is_price_per_guest {
        i64::from(guest_count)
    } else {
        1
    };

    days.checked_mul(unit_price)
        .and_then(|total| total.checked_mul(multiplier))
        .ok_or_else(|| BookingError::Validation("price overflows".to_string()))
}
