//! Domain records: identifiers, date ranges, availability periods and reservations.
//!
//! Field names serialize in camelCase, which is the shape the surrounding
//! services already speak.

use crate::error::{BookingError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// The underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an identifier issued elsewhere.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

uuid_id!(
    /// Identifier of an availability period, generated by this service.
    AvailabilityPeriodId
);

uuid_id!(
    /// Identifier of a reservation, generated by this service.
    ReservationId
);

string_id!(
    /// Identifier of an accommodation, issued by the listings service.
    AccommodationId
);

string_id!(
    /// Identifier of a user (host or guest), issued by the accounts service.
    UserId
);

/// Half-open time interval `[start, end)` with `start < end`.
///
/// # Examples
///
/// ```
/// use booking_core::DateRange;
/// use chrono::{TimeZone, Utc};
///
/// let day = |d| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).single().ok_or("bad date");
///
/// let a = DateRange::new(day(1)?, day(3)?)?;
/// let b = DateRange::new(day(3)?, day(5)?)?;
///
/// // Touching ranges share no instant
/// assert!(!a.overlaps(&b));
/// assert!(DateRange::new(day(3)?, day(3)?).is_err());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateRange {
    /// Build a range, rejecting empty or inverted bounds.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] when `start >= end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(BookingError::Validation(format!(
                "start date {start} must be before end date {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Inclusive lower bound.
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive upper bound.
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Elapsed time between the bounds.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Half-open intersection test.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        crate::overlap::ranges_overlap(self.start, self.end, other.start, other.end)
    }

    /// `true` when `inner` lies strictly inside `self` (no shared bound).
    #[must_use]
    pub fn strictly_contains(&self, inner: &Self) -> bool {
        self.start < inner.start && inner.end < self.end
    }
}

/// A priced window during which an accommodation can be booked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityPeriod {
    /// Period identifier.
    pub id: AvailabilityPeriodId,
    /// Accommodation the window belongs to.
    pub accommodation_id: AccommodationId,
    /// Owner of the accommodation.
    pub host_id: UserId,
    /// First bookable instant.
    pub start_date: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end_date: DateTime<Utc>,
    /// Price per night, or per guest per night.
    #[serde(alias = "price")]
    pub unit_price: i64,
    /// Multiply the price by the guest count.
    pub is_price_per_guest: bool,
}

impl AvailabilityPeriod {
    /// The window as a [`DateRange`].
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] if the stored bounds are inverted.
    pub fn range(&self) -> Result<DateRange> {
        DateRange::new(self.start_date, self.end_date)
    }
}

/// Host-supplied fields for a new availability period.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAvailabilityPeriod {
    /// Accommodation to open for booking.
    pub accommodation_id: AccommodationId,
    /// First bookable instant.
    pub start_date: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end_date: DateTime<Utc>,
    /// Price per night, or per guest per night.
    #[serde(alias = "price")]
    pub unit_price: i64,
    /// Multiply the price by the guest count.
    #[serde(default)]
    pub is_price_per_guest: bool,
}

impl NewAvailabilityPeriod {
    /// Check bounds and price.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] for inverted bounds or a negative price.
    pub fn validate(&self) -> Result<()> {
        DateRange::new(self.start_date, self.end_date)?;
        if self.unit_price < 0 {
            return Err(BookingError::Validation(
                "unit price must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Materialize the period under a fresh id for the given host.
    #[must_use]
    pub fn into_period(self, host_id: UserId) -> AvailabilityPeriod {
        AvailabilityPeriod {
            id: AvailabilityPeriodId::new(),
            accommodation_id: self.accommodation_id,
            host_id,
            start_date: self.start_date,
            end_date: self.end_date,
            unit_price: self.unit_price,
            is_price_per_guest: self.is_price_per_guest,
        }
    }
}

/// Changes a host may apply to an existing period.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodChanges {
    /// New first bookable instant.
    pub start_date: DateTime<Utc>,
    /// New end of the window.
    pub end_date: DateTime<Utc>,
    /// New unit price.
    #[serde(alias = "price")]
    pub unit_price: i64,
    /// New per-guest flag.
    #[serde(default)]
    pub is_price_per_guest: bool,
}

/// A confirmed booking inside an availability period.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    /// Reservation identifier.
    pub id: ReservationId,
    /// Parent availability period.
    pub availability_period_id: AvailabilityPeriodId,
    /// Accommodation being booked.
    pub accommodation_id: AccommodationId,
    /// Owner of the accommodation.
    pub host_id: UserId,
    /// Guest who booked.
    pub guest_id: UserId,
    /// Check-in instant.
    pub start_date: DateTime<Utc>,
    /// Check-out instant (exclusive).
    pub end_date: DateTime<Utc>,
    /// Number of guests, at least one.
    #[serde(alias = "guestNum")]
    pub guest_count: u32,
    /// Total price computed at booking time.
    pub price: i64,
}

impl Reservation {
    /// Booked interval.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] if the stored bounds are inverted.
    pub fn range(&self) -> Result<DateRange> {
        DateRange::new(self.start_date, self.end_date)
    }

    /// A reservation can be cancelled only before its stay begins.
    #[must_use]
    pub fn is_cancellable(&self, now: DateTime<Utc>) -> bool {
        now < self.start_date
    }

    /// Where `now` falls relative to the stay.
    #[must_use]
    pub fn phase(&self, now: DateTime<Utc>) -> ReservationPhase {
        if now < self.start_date {
            ReservationPhase::Upcoming
        } else if now < self.end_date {
            ReservationPhase::InProgress
        } else {
            ReservationPhase::Completed
        }
    }
}

/// Read-only view of a reservation's position in time. Never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationPhase {
    /// Stay has not begun; still cancellable.
    Upcoming,
    /// Guest is checked in.
    InProgress,
    /// Stay is over.
    Completed,
}

/// Guest-supplied fields for a new reservation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReservation {
    /// Period to book within.
    pub availability_period_id: AvailabilityPeriodId,
    /// Accommodation the period belongs to.
    pub accommodation_id: AccommodationId,
    /// Check-in instant.
    pub start_date: DateTime<Utc>,
    /// Check-out instant (exclusive).
    pub end_date: DateTime<Utc>,
    /// Number of guests.
    #[serde(alias = "guestNum")]
    pub guest_count: u32,
}

impl NewReservation {
    /// Check bounds and guest count.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] for inverted bounds or zero guests.
    pub fn validate(&self) -> Result<DateRange> {
        let range = DateRange::new(self.start_date, self.end_date)?;
        if self.guest_count == 0 {
            return Err(BookingError::Validation(
                "guest count must be at least 1".to_string(),
            ));
        }
        Ok(range)
    }
}

/// What the listings service tells us about an accommodation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accommodation {
    /// Accommodation identifier.
    pub id: AccommodationId,
    /// Host who owns it.
    pub owner_id: UserId,
    /// Display name used in notifications.
    pub name: String,
}

/// Alert delivered to a host through the notification service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationNotification {
    /// Recipient.
    pub host_id: UserId,
    /// Human-readable message.
    pub text: String,
    /// When the event happened.
    pub time: DateTime<Utc>,
}

impl ReservationNotification {
    /// Message sent to the host when a guest books.
    #[must_use]
    pub fn reserved(
        host_id: UserId,
        accommodation_name: &str,
        guest_id: &UserId,
        time: DateTime<Utc>,
    ) -> Self {
        Self {
            host_id,
            text: format!(
                "Your accommodation {accommodation_name} has been reserved (by {guest_id})"
            ),
            time,
        }
    }

    /// Message sent to the host when a guest cancels.
    #[must_use]
    pub fn cancelled(
        reservation: &Reservation,
        accommodation_name: &str,
        time: DateTime<Utc>,
    ) -> Self {
        Self {
            host_id: reservation.host_id.clone(),
            text: format!(
                "Reservation ({} to {}) for your accommodation {accommodation_name} has been canceled (by {})",
                reservation.start_date.format("%Y-%m-%d"),
                reservation.end_date.format("%Y-%m-%d"),
                reservation.guest_id
            ),
            time,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn reservation(start: u32, end: u32) -> Reservation {
        Reservation {
            id: ReservationId::new(),
            availability_period_id: AvailabilityPeriodId::new(),
            accommodation_id: AccommodationId::new("acc-1"),
            host_id: UserId::new("host-1"),
            guest_id: UserId::new("guest-1"),
            start_date: day(start),
            end_date: day(end),
            guest_count: 2,
            price: 100,
        }
    }

    #[test]
    fn date_range_rejects_empty_and_inverted() {
        assert!(DateRange::new(day(2), day(2)).is_err());
        assert!(DateRange::new(day(3), day(2)).is_err());
        assert!(DateRange::new(day(2), day(3)).is_ok());
    }

    #[test]
    fn strict_containment_excludes_shared_bounds() {
        let period = DateRange::new(day(1), day(10)).unwrap();
        assert!(period.strictly_contains(&DateRange::new(day(2), day(4)).unwrap()));
        assert!(!period.strictly_contains(&DateRange::new(day(1), day(4)).unwrap()));
        assert!(!period.strictly_contains(&DateRange::new(day(8), day(10)).unwrap()));
        assert!(!period.strictly_contains(&DateRange::new(day(8), day(12)).unwrap()));
    }

    #[test]
    fn cancellable_only_before_start() {
        let r = reservation(5, 7);
        assert!(r.is_cancellable(day(4)));
        assert!(!r.is_cancellable(day(5)));
        assert!(!r.is_cancellable(day(8)));
    }

    #[test]
    fn phase_follows_the_clock() {
        let r = reservation(5, 7);
        assert_eq!(r.phase(day(1)), ReservationPhase::Upcoming);
        assert_eq!(r.phase(day(5)), ReservationPhase::InProgress);
        assert_eq!(r.phase(day(7)), ReservationPhase::Completed);
    }

    #[test]
    fn new_reservation_requires_a_guest() {
        let new = NewReservation {
            availability_period_id: AvailabilityPeriodId::new(),
            accommodation_id: AccommodationId::new("acc-1"),
            start_date: day(2),
            end_date: day(4),
            guest_count: 0,
        };
        assert!(matches!(new.validate(), Err(BookingError::Validation(_))));
    }

    #[test]
    fn period_accepts_legacy_price_field() {
        let json = r#"{
            "accommodationId": "acc-1",
            "startDate": "2024-01-01T00:00:00Z",
            "endDate": "2024-01-10T00:00:00Z",
            "price": 50,
            "isPricePerGuest": true
        }"#;
        let new: NewAvailabilityPeriod = serde_json::from_str(json).unwrap();
        assert_eq!(new.unit_price, 50);
        assert!(new.is_price_per_guest);
    }

    #[test]
    fn cancellation_text_names_dates_and_guest() {
        let r = reservation(2, 4);
        let n = ReservationNotification::cancelled(&r, "Sea View", day(1));
        assert_eq!(
            n.text,
            "Reservation (2024-01-02 to 2024-01-04) for your accommodation Sea View has been canceled (by guest-1)"
        );
        assert_eq!(n.host_id, UserId::new("host-1"));
    }
}
