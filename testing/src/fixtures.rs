//! Test data builders. All dates fall in January 2024 at midnight UTC.

#![allow(clippy::expect_used)]
#![allow(clippy::missing_panics_doc)]

use booking_core::{
    Accommodation, AccommodationId, AvailabilityPeriodId, NewAvailabilityPeriod,
    NewReservation, Reservation, ReservationId, UserId,
};
use chrono::{DateTime, TimeZone, Utc};

/// Midnight UTC on January `d`, 2024.
#[must_use]
pub fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0)
        .single()
        .expect("valid January 2024 date")
}

/// Period request for `accommodation` spanning January `start..end`.
#[must_use]
pub fn new_period(accommodation: &str, start: u32, end: u32, unit_price: i64) -> NewAvailabilityPeriod {
    NewAvailabilityPeriod {
        accommodation_id: AccommodationId::new(accommodation),
        start_date: day(start),
        end_date: day(end),
        unit_price,
        is_price_per_guest: false,
    }
}

/// Reservation request under `period` spanning January `start..end`.
#[must_use]
pub fn new_reservation(
    accommodation: &str,
    period: AvailabilityPeriodId,
    start: u32,
    end: u32,
    guest_count: u32,
) -> NewReservation {
    NewReservation {
        availability_period_id: period,
        accommodation_id: AccommodationId::new(accommodation),
        start_date: day(start),
        end_date: day(end),
        guest_count,
    }
}

/// Stored reservation on `acc-1` owned by `host-1`, for ledger-level tests.
#[must_use]
pub fn reservation_on(
    period: AvailabilityPeriodId,
    guest: &str,
    start: u32,
    end: u32,
) -> Reservation {
    Reservation {
        id: ReservationId::new(),
        availability_period_id: period,
        accommodation_id: AccommodationId::new("acc-1"),
        host_id: UserId::new("host-1"),
        guest_id: UserId::new(guest),
        start_date: day(start),
        end_date: day(end),
        guest_count: 1,
        price: 0,
    }
}

/// Listing as the accommodation service would describe it.
#[must_use]
pub fn accommodation(id: &str, owner: &str, name: &str) -> Accommodation {
    Accommodation {
        id: AccommodationId::new(id),
        owner_id: UserId::new(owner),
        name: name.to_string(),
    }
}
