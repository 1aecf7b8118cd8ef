//! Storage and collaborator abstractions.
//!
//! # Implementations
//!
//! - In-memory store and ledger (in `booking-testing`): default local backend
//!   and the backend used by tests
//! - `PostgresAvailabilityStore` / `PostgresReservationLedger` (in
//!   `booking-postgres`): production backend
//! - HTTP directory and gateway clients (in `booking-service`), each behind a
//!   circuit breaker
//!
//! # Dyn Compatibility
//!
//! Methods return `Pin<Box<dyn Future>>` rather than using `async fn` so the
//! coordinator can hold every port as `Arc<dyn Trait>` and swap backends at
//! startup.

use crate::error::Result;
use crate::types::{
    Accommodation, AccommodationId, AvailabilityPeriod, AvailabilityPeriodId,
    NewAvailabilityPeriod, Reservation, ReservationId, ReservationNotification, UserId,
};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by every port method.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Owns availability-period records, keyed by accommodation.
///
/// The store does not check ownership. Callers confirm with the
/// [`AccommodationDirectory`] that the accommodation exists and belongs to
/// the host before inserting.
pub trait AvailabilityStore: Send + Sync {
    /// Persist a new period for `host_id`, assigning its id.
    ///
    /// # Errors
    ///
    /// - `Validation`: inverted bounds
    /// - `Storage`: backend failure
    fn insert_period(
        &self,
        host_id: UserId,
        period: NewAvailabilityPeriod,
    ) -> BoxFuture<'_, AvailabilityPeriod>;

    /// Fetch one period of an accommodation.
    ///
    /// # Errors
    ///
    /// - `Storage`: backend failure
    fn get_period(
        &self,
        accommodation_id: &AccommodationId,
        period_id: AvailabilityPeriodId,
    ) -> BoxFuture<'_, Option<AvailabilityPeriod>>;

    /// All periods of an accommodation, ordered by start date.
    ///
    /// # Errors
    ///
    /// - `Storage`: backend failure
    fn list_by_accommodation(
        &self,
        accommodation_id: &AccommodationId,
    ) -> BoxFuture<'_, Vec<AvailabilityPeriod>>;

    /// Replace the bounds and pricing of an existing period.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such period
    /// - `Conflict`: a reservation on the period would fall outside the new bounds
    ///   (enforced at commit by backends that can)
    /// - `Storage`: backend failure
    fn update_period(&self, period: AvailabilityPeriod) -> BoxFuture<'_, AvailabilityPeriod>;

    /// Remove a period.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such period
    /// - `Conflict`: reservations still reference it (enforced at commit by
    ///   backends that can)
    /// - `Storage`: backend failure
    fn delete_period(
        &self,
        accommodation_id: &AccommodationId,
        period_id: AvailabilityPeriodId,
    ) -> BoxFuture<'_, ()>;

    /// Cheap liveness probe used by readiness checks.
    ///
    /// # Errors
    ///
    /// - `Storage`: backend unreachable
    fn ping(&self) -> BoxFuture<'_, ()>;
}

/// Owns reservation records.
///
/// Each reservation is stored once; the by-period, by-guest and by-date-range
/// lookups are indexes over that single record, updated in the same commit.
/// A reservation therefore reads identically through every query path.
pub trait ReservationLedger: Send + Sync {
    /// Persist a reservation.
    ///
    /// The overlap rule is re-checked atomically with the write: when another
    /// reservation on the same period intersects `[start, end)`, nothing is
    /// written and `Conflict` is returned.
    ///
    /// # Errors
    ///
    /// - `Conflict`: overlaps an existing reservation on the same period
    /// - `Storage`: backend failure
    fn insert(&self, reservation: Reservation) -> BoxFuture<'_, Reservation>;

    /// Reservations under a period, ordered by start date.
    ///
    /// # Errors
    ///
    /// - `Storage`: backend failure
    fn list_by_period(&self, period_id: AvailabilityPeriodId) -> BoxFuture<'_, Vec<Reservation>>;

    /// Reservations made by a guest, ordered by start date.
    ///
    /// # Errors
    ///
    /// - `Storage`: backend failure
    fn list_by_guest(&self, guest_id: &UserId) -> BoxFuture<'_, Vec<Reservation>>;

    /// One reservation, visible only to the guest who made it.
    ///
    /// # Errors
    ///
    /// - `Storage`: backend failure
    fn get_for_guest(
        &self,
        reservation_id: ReservationId,
        guest_id: &UserId,
    ) -> BoxFuture<'_, Option<Reservation>>;

    /// Reservations under a period intersecting `[start, end)`.
    ///
    /// # Errors
    ///
    /// - `Storage`: backend failure
    fn find_overlapping(
        &self,
        period_id: AvailabilityPeriodId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<Reservation>>;

    /// Whether any reservation on the accommodation ends after `now`.
    ///
    /// # Errors
    ///
    /// - `Storage`: backend failure
    fn any_ending_after(
        &self,
        accommodation_id: &AccommodationId,
        now: DateTime<Utc>,
    ) -> BoxFuture<'_, bool>;

    /// Remove a reservation from every index.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such reservation
    /// - `Storage`: backend failure
    fn delete(&self, reservation_id: ReservationId) -> BoxFuture<'_, ()>;

    /// Cheap liveness probe used by readiness checks.
    ///
    /// # Errors
    ///
    /// - `Storage`: backend unreachable
    fn ping(&self) -> BoxFuture<'_, ()>;
}

/// The listings service: does an accommodation exist, and who owns it.
pub trait AccommodationDirectory: Send + Sync {
    /// Look up an accommodation. `Ok(None)` means the listings service
    /// answered that it does not exist.
    ///
    /// # Errors
    ///
    /// - `UpstreamUnavailable`: service unreachable, timed out, or breaker open
    fn get_accommodation(
        &self,
        accommodation_id: &AccommodationId,
    ) -> BoxFuture<'_, Option<Accommodation>>;
}

/// The notification service: alerts hosts about bookings.
pub trait NotificationGateway: Send + Sync {
    /// Deliver one notification.
    ///
    /// # Errors
    ///
    /// - `UpstreamUnavailable`: service unreachable, timed out, rejected the
    ///   message, or breaker open
    fn send_reservation_notification(
        &self,
        notification: ReservationNotification,
    ) -> BoxFuture<'_, ()>;
}
