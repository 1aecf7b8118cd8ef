//! In-memory storage backends.
//!
//! Used by tests and as the `memory` backend for local runs. Each backend
//! keeps one source-of-truth map plus secondary indexes, all behind a single
//! lock, so every write updates every index or none of them.
//!
//! [`linked_backends`] pairs a store with a ledger so that reservation inserts
//! and period updates or deletes see each other. Locks are always taken
//! periods first, then reservations.

use booking_core::overlap::ranges_overlap;
use booking_core::ports::{AvailabilityStore, BoxFuture, ReservationLedger};
use booking_core::{
    AccommodationId, AvailabilityPeriod, AvailabilityPeriodId, BookingError,
    NewAvailabilityPeriod, Reservation, ReservationId, Result, UserId,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

fn poisoned<T>(_: PoisonError<T>) -> BookingError {
    BookingError::Storage("in-memory lock poisoned".to_string())
}

/// Index key ordering entries by start date, then id.
type SlotKey = (DateTime<Utc>, ReservationId);

type PeriodMap = HashMap<AccommodationId, Vec<AvailabilityPeriod>>;

/// A store and ledger sharing their locks.
///
/// The ledger refuses stays that are not strictly inside a live period, and
/// the store refuses to shrink or delete a period out from under its
/// reservations. Both checks run under the lock of the write they guard.
#[must_use]
pub fn linked_backends() -> (InMemoryAvailabilityStore, InMemoryReservationLedger) {
    let store = InMemoryAvailabilityStore::new();
    let ledger = InMemoryReservationLedger {
        periods: Some(Arc::clone(&store.periods)),
        ..InMemoryReservationLedger::new()
    };
    let store = InMemoryAvailabilityStore {
        reservations: Some(Arc::clone(&ledger.state)),
        ..store
    };
    (store, ledger)
}

#[derive(Debug, Default)]
struct LedgerState {
    records: HashMap<ReservationId, Reservation>,
    by_period: HashMap<AvailabilityPeriodId, BTreeSet<SlotKey>>,
    by_guest: HashMap<UserId, BTreeSet<SlotKey>>,
}

impl LedgerState {
    fn by_period(&self, period_id: AvailabilityPeriodId) -> Vec<Reservation> {
        self.by_period
            .get(&period_id)
            .map(|slots| self.resolve(slots.iter()))
            .unwrap_or_default()
    }

    fn resolve<'a>(&'a self, keys: impl Iterator<Item = &'a SlotKey>) -> Vec<Reservation> {
        keys.filter_map(|(_, id)| self.records.get(id))
            .cloned()
            .collect()
    }

    fn overlapping(
        &self,
        period_id: AvailabilityPeriodId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<Reservation> {
        let Some(slots) = self.by_period.get(&period_id) else {
            return Vec::new();
        };
        // Entries starting at or after `end` cannot intersect
        slots
            .iter()
            .take_while(|(slot_start, _)| *slot_start < end)
            .filter_map(|(_, id)| self.records.get(id))
            .filter(|r| ranges_overlap(r.start_date, r.end_date, start, end))
            .cloned()
            .collect()
    }
}

/// In-memory reservation ledger.
///
/// # Example
///
/// ```
/// use booking_testing::InMemoryReservationLedger;
/// use booking_testing::fixtures::reservation_on;
/// use booking_core::ports::ReservationLedger;
/// use booking_core::AvailabilityPeriodId;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let ledger = InMemoryReservationLedger::new();
/// let period = AvailabilityPeriodId::new();
///
/// ledger.insert(reservation_on(period, "guest-1", 2, 4)).await?;
///
/// // Touching the end of the first stay is fine
/// ledger.insert(reservation_on(period, "guest-2", 4, 6)).await?;
///
/// // Overlapping is not
/// assert!(ledger.insert(reservation_on(period, "guest-3", 5, 7)).await.is_err());
/// assert_eq!(ledger.list_by_period(period).await?.len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryReservationLedger {
    state: Arc<RwLock<LedgerState>>,
    periods: Option<Arc<RwLock<PeriodMap>>>,
}

impl InMemoryReservationLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored reservations.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.records.len())
    }

    /// `true` when no reservation is stored.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.records.is_empty())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LedgerState>> {
        self.state.read().map_err(poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LedgerState>> {
        self.state.write().map_err(poisoned)
    }

    fn insert_now(&self, reservation: Reservation) -> Result<Reservation> {
        let periods = match &self.periods {
            Some(periods) => Some(periods.read().map_err(poisoned)?),
            None => None,
        };
        if let Some(periods) = &periods {
            let period = periods
                .get(&reservation.accommodation_id)
                .and_then(|list| list.iter().find(|p| p.id == reservation.availability_period_id))
                .ok_or_else(|| {
                    BookingError::not_found("Availability period", reservation.availability_period_id)
                })?;
            if !period.range()?.strictly_contains(&reservation.range()?) {
                return Err(BookingError::OutOfRange(format!(
                    "dates {} to {} are outside the availability period ({} to {})",
                    reservation.start_date, reservation.end_date, period.start_date, period.end_date
                )));
            }
        }
        let mut state = self.write()?;

        if state.records.contains_key(&reservation.id) {
            return Err(BookingError::Conflict(format!(
                "reservation {} already exists",
                reservation.id
            )));
        }
        if let Some(existing) = state
            .overlapping(
                reservation.availability_period_id,
                reservation.start_date,
                reservation.end_date,
            )
            .first()
        {
            return Err(BookingError::Conflict(format!(
                "dates overlap reservation {} ({} to {})",
                existing.id, existing.start_date, existing.end_date
            )));
        }

        let key = (reservation.start_date, reservation.id);
        state
            .by_period
            .entry(reservation.availability_period_id)
            .or_default()
            .insert(key);
        state
            .by_guest
            .entry(reservation.guest_id.clone())
            .or_default()
            .insert(key);
        state.records.insert(reservation.id, reservation.clone());

        Ok(reservation)
    }

    fn delete_now(&self, reservation_id: ReservationId) -> Result<()> {
        let mut state = self.write()?;

        let removed = state
            .records
            .remove(&reservation_id)
            .ok_or_else(|| BookingError::not_found("Reservation", reservation_id))?;

        let key = (removed.start_date, removed.id);
        if let Some(slots) = state.by_period.get_mut(&removed.availability_period_id) {
            slots.remove(&key);
            if slots.is_empty() {
                state.by_period.remove(&removed.availability_period_id);
            }
        }
        if let Some(slots) = state.by_guest.get_mut(&removed.guest_id) {
            slots.remove(&key);
            if slots.is_empty() {
                state.by_guest.remove(&removed.guest_id);
            }
        }
        Ok(())
    }
}

impl ReservationLedger for InMemoryReservationLedger {
    fn insert(&self, reservation: Reservation) -> BoxFuture<'_, Reservation> {
        let result = self.insert_now(reservation);
        Box::pin(async move { result })
    }

    fn list_by_period(&self, period_id: AvailabilityPeriodId) -> BoxFuture<'_, Vec<Reservation>> {
        let result = self.read().map(|state| state.by_period(period_id));
        Box::pin(async move { result })
    }

    fn list_by_guest(&self, guest_id: &UserId) -> BoxFuture<'_, Vec<Reservation>> {
        let result = self.read().map(|state| {
            state
                .by_guest
                .get(guest_id)
                .map(|slots| state.resolve(slots.iter()))
                .unwrap_or_default()
        });
        Box::pin(async move { result })
    }

    fn get_for_guest(
        &self,
        reservation_id: ReservationId,
        guest_id: &UserId,
    ) -> BoxFuture<'_, Option<Reservation>> {
        let result = self.read().map(|state| {
            state
                .records
                .get(&reservation_id)
                .filter(|r| &r.guest_id == guest_id)
                .cloned()
        });
        Box::pin(async move { result })
    }

    fn find_overlapping(
        &self,
        period_id: AvailabilityPeriodId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<Reservation>> {
        let result = self
            .read()
            .map(|state| state.overlapping(period_id, start, end));
        Box::pin(async move { result })
    }

    fn any_ending_after(
        &self,
        accommodation_id: &AccommodationId,
        now: DateTime<Utc>,
    ) -> BoxFuture<'_, bool> {
        let result = self.read().map(|state| {
            state
                .records
                .values()
                .any(|r| &r.accommodation_id == accommodation_id && r.end_date > now)
        });
        Box::pin(async move { result })
    }

    fn delete(&self, reservation_id: ReservationId) -> BoxFuture<'_, ()> {
        let result = self.delete_now(reservation_id);
        Box::pin(async move { result })
    }

    fn ping(&self) -> BoxFuture<'_, ()> {
        let result = self.read().map(|_| ());
        Box::pin(async move { result })
    }
}

/// In-memory availability store.
///
/// Periods of one accommodation may not overlap; the check runs under the
/// same lock as the write.
#[derive(Clone, Debug, Default)]
pub struct InMemoryAvailabilityStore {
    periods: Arc<RwLock<PeriodMap>>,
    reservations: Option<Arc<RwLock<LedgerState>>>,
}

impl InMemoryAvailabilityStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn check_free(
        existing: &[AvailabilityPeriod],
        candidate: &AvailabilityPeriod,
    ) -> Result<()> {
        if let Some(clash) = existing.iter().find(|p| {
            p.id != candidate.id
                && ranges_overlap(p.start_date, p.end_date, candidate.start_date, candidate.end_date)
        }) {
            return Err(BookingError::Conflict(format!(
                "availability period overlaps period {} ({} to {})",
                clash.id, clash.start_date, clash.end_date
            )));
        }
        Ok(())
    }

    /// Reservations under `period_id` that `keep` rejects, read while the
    /// caller holds the periods write lock.
    fn stranded(
        &self,
        period_id: AvailabilityPeriodId,
        keep: impl Fn(&Reservation) -> Result<bool>,
    ) -> Result<Option<Reservation>> {
        let Some(reservations) = &self.reservations else {
            return Ok(None);
        };
        let state = reservations.read().map_err(poisoned)?;
        for reservation in state.by_period(period_id) {
            if !keep(&reservation)? {
                return Ok(Some(reservation));
            }
        }
        Ok(None)
    }

    fn insert_now(&self, host_id: UserId, new: NewAvailabilityPeriod) -> Result<AvailabilityPeriod> {
        new.validate()?;
        let period = new.into_period(host_id);

        let mut periods = self.periods.write().map_err(poisoned)?;
        let list = periods.entry(period.accommodation_id.clone()).or_default();
        Self::check_free(list, &period)?;
        list.push(period.clone());
        list.sort_by_key(|p| p.start_date);
        Ok(period)
    }

    fn update_now(&self, period: AvailabilityPeriod) -> Result<AvailabilityPeriod> {
        period.range()?;

        let mut periods = self.periods.write().map_err(poisoned)?;
        let list = periods
            .get_mut(&period.accommodation_id)
            .ok_or_else(|| BookingError::not_found("Availability period", period.id))?;
        let index = list
            .iter()
            .position(|p| p.id == period.id)
            .ok_or_else(|| BookingError::not_found("Availability period", period.id))?;
        Self::check_free(list, &period)?;
        let range = period.range()?;
        if let Some(outside) =
            self.stranded(period.id, |r| Ok(range.strictly_contains(&r.range()?)))?
        {
            return Err(BookingError::Conflict(format!(
                "reservation {} ({} to {}) would fall outside the new bounds",
                outside.id, outside.start_date, outside.end_date
            )));
        }
        list[index] = period.clone();
        list.sort_by_key(|p| p.start_date);
        Ok(period)
    }

    fn delete_now(
        &self,
        accommodation_id: &AccommodationId,
        period_id: AvailabilityPeriodId,
    ) -> Result<()> {
        let mut periods = self.periods.write().map_err(poisoned)?;
        let list = periods
            .get_mut(accommodation_id)
            .ok_or_else(|| BookingError::not_found("Availability period", period_id))?;
        if let Some(booked) = self.stranded(period_id, |_| Ok(false))? {
            return Err(BookingError::Conflict(format!(
                "availability period {period_id} still has reservation {}",
                booked.id
            )));
        }
        let before = list.len();
        list.retain(|p| p.id != period_id);
        if list.len() == before {
            return Err(BookingError::not_found("Availability period", period_id));
        }
        if list.is_empty() {
            periods.remove(accommodation_id);
        }
        Ok(())
    }
}

impl AvailabilityStore for InMemoryAvailabilityStore {
    fn insert_period(
        &self,
        host_id: UserId,
        period: NewAvailabilityPeriod,
    ) -> BoxFuture<'_, AvailabilityPeriod> {
        let result = self.insert_now(host_id, period);
        Box::pin(async move { result })
    }

    fn get_period(
        &self,
        accommodation_id: &AccommodationId,
        period_id: AvailabilityPeriodId,
    ) -> BoxFuture<'_, Option<AvailabilityPeriod>> {
        let result = self.periods.read().map_err(poisoned).map(|periods| {
            periods
                .get(accommodation_id)
                .and_then(|list| list.iter().find(|p| p.id == period_id))
                .cloned()
        });
        Box::pin(async move { result })
    }

    fn list_by_accommodation(
        &self,
        accommodation_id: &AccommodationId,
    ) -> BoxFuture<'_, Vec<AvailabilityPeriod>> {
        let result = self
            .periods
            .read()
            .map_err(poisoned)
            .map(|periods| periods.get(accommodation_id).cloned().unwrap_or_default());
        Box::pin(async move { result })
    }

    fn update_period(&self, period: AvailabilityPeriod) -> BoxFuture<'_, AvailabilityPeriod> {
        let result = self.update_now(period);
        Box::pin(async move { result })
    }

    fn delete_period(
        &self,
        accommodation_id: &AccommodationId,
        period_id: AvailabilityPeriodId,
    ) -> BoxFuture<'_, ()> {
        let result = self.delete_now(accommodation_id, period_id);
        Box::pin(async move { result })
    }

    fn ping(&self) -> BoxFuture<'_, ()> {
        let result = self.periods.read().map_err(poisoned).map(|_| ());
        Box::pin(async move { result })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fixtures::{day, new_period, reservation_on};

    #[tokio::test]
    async fn record_is_identical_on_every_path() {
        let ledger = InMemoryReservationLedger::new();
        let period = AvailabilityPeriodId::new();
        let created = ledger
            .insert(reservation_on(period, "guest-1", 2, 4))
            .await
            .unwrap();

        let by_period = ledger.list_by_period(period).await.unwrap();
        let by_guest = ledger.list_by_guest(&UserId::new("guest-1")).await.unwrap();
        let by_range = ledger.find_overlapping(period, day(1), day(10)).await.unwrap();

        assert_eq!(by_period, vec![created.clone()]);
        assert_eq!(by_guest, vec![created.clone()]);
        assert_eq!(by_range, vec![created]);
    }

    #[tokio::test]
    async fn conflicting_insert_leaves_no_trace() {
        let ledger = InMemoryReservationLedger::new();
        let period = AvailabilityPeriodId::new();
        ledger.insert(reservation_on(period, "g", 2, 4)).await.unwrap();

        for _ in 0..3 {
            let err = ledger
                .insert(reservation_on(period, "h", 3, 5))
                .await
                .unwrap_err();
            assert!(matches!(err, BookingError::Conflict(_)));
        }

        assert_eq!(ledger.len().unwrap(), 1);
        assert!(ledger.list_by_guest(&UserId::new("h")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn different_periods_do_not_conflict() {
        let ledger = InMemoryReservationLedger::new();
        ledger
            .insert(reservation_on(AvailabilityPeriodId::new(), "g", 2, 4))
            .await
            .unwrap();
        ledger
            .insert(reservation_on(AvailabilityPeriodId::new(), "g", 2, 4))
            .await
            .unwrap();
        assert_eq!(ledger.len().unwrap(), 2);
    }

    #[tokio::test]
    async fn concurrent_overlapping_inserts_admit_exactly_one() {
        let ledger = InMemoryReservationLedger::new();
        let period = AvailabilityPeriodId::new();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let ledger = ledger.clone();
                tokio::spawn(async move {
                    ledger
                        .insert(reservation_on(period, &format!("guest-{i}"), 3, 6))
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(ledger.list_by_period(period).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_clears_every_index() {
        let ledger = InMemoryReservationLedger::new();
        let period = AvailabilityPeriodId::new();
        let r = ledger
            .insert(reservation_on(period, "g", 2, 4))
            .await
            .unwrap();

        ledger.delete(r.id).await.unwrap();

        assert!(ledger.is_empty().unwrap());
        assert!(ledger.list_by_period(period).await.unwrap().is_empty());
        assert!(ledger.list_by_guest(&UserId::new("g")).await.unwrap().is_empty());
        assert!(ledger.find_overlapping(period, day(1), day(9)).await.unwrap().is_empty());
        assert!(matches!(
            ledger.delete(r.id).await,
            Err(BookingError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn get_for_guest_hides_other_guests_bookings() {
        let ledger = InMemoryReservationLedger::new();
        let r = ledger
            .insert(reservation_on(AvailabilityPeriodId::new(), "owner", 2, 4))
            .await
            .unwrap();

        assert!(ledger.get_for_guest(r.id, &UserId::new("owner")).await.unwrap().is_some());
        assert!(ledger.get_for_guest(r.id, &UserId::new("other")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lists_are_ordered_by_start() {
        let ledger = InMemoryReservationLedger::new();
        let period = AvailabilityPeriodId::new();
        ledger.insert(reservation_on(period, "g", 6, 8)).await.unwrap();
        ledger.insert(reservation_on(period, "g", 2, 4)).await.unwrap();

        let starts: Vec<_> = ledger
            .list_by_guest(&UserId::new("g"))
            .await
            .unwrap()
            .iter()
            .map(|r| r.start_date)
            .collect();
        assert_eq!(starts, vec![day(2), day(6)]);
    }

    #[tokio::test]
    async fn any_ending_after_only_counts_future_stays() {
        let ledger = InMemoryReservationLedger::new();
        ledger
            .insert(reservation_on(AvailabilityPeriodId::new(), "g", 2, 4))
            .await
            .unwrap();
        let acc = AccommodationId::new("acc-1");

        assert!(ledger.any_ending_after(&acc, day(3)).await.unwrap());
        assert!(!ledger.any_ending_after(&acc, day(4)).await.unwrap());
        assert!(!ledger
            .any_ending_after(&AccommodationId::new("acc-2"), day(1))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn periods_of_one_accommodation_cannot_overlap() {
        let store = InMemoryAvailabilityStore::new();
        let host = UserId::new("host-1");
        store
            .insert_period(host.clone(), new_period("acc-1", 1, 10, 50))
            .await
            .unwrap();

        let clash = store
            .insert_period(host.clone(), new_period("acc-1", 5, 15, 50))
            .await;
        assert!(matches!(clash, Err(BookingError::Conflict(_))));

        store
            .insert_period(host.clone(), new_period("acc-1", 10, 20, 60))
            .await
            .unwrap();
        store
            .insert_period(host, new_period("acc-2", 5, 15, 50))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn periods_are_listed_by_start_date() {
        let store = InMemoryAvailabilityStore::new();
        let host = UserId::new("host-1");
        let late = store
            .insert_period(host.clone(), new_period("acc-1", 15, 20, 50))
            .await
            .unwrap();
        let early = store
            .insert_period(host, new_period("acc-1", 1, 10, 50))
            .await
            .unwrap();

        let listed = store
            .list_by_accommodation(&AccommodationId::new("acc-1"))
            .await
            .unwrap();
        assert_eq!(listed, vec![early, late]);
    }

    #[tokio::test]
    async fn update_and_delete_period() {
        let store = InMemoryAvailabilityStore::new();
        let acc = AccommodationId::new("acc-1");
        let mut period = store
            .insert_period(UserId::new("host-1"), new_period("acc-1", 1, 10, 50))
            .await
            .unwrap();

        period.unit_price = 75;
        period.end_date = day(12);
        store.update_period(period.clone()).await.unwrap();
        assert_eq!(
            store.get_period(&acc, period.id).await.unwrap(),
            Some(period.clone())
        );

        store.delete_period(&acc, period.id).await.unwrap();
        assert!(store.get_period(&acc, period.id).await.unwrap().is_none());
        assert!(matches!(
            store.delete_period(&acc, period.id).await,
            Err(BookingError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn linked_ledger_requires_a_containing_period() {
        let (store, ledger) = linked_backends();
        let period = store
            .insert_period(UserId::new("host-1"), new_period("acc-1", 1, 10, 50))
            .await
            .unwrap();

        let missing = ledger
            .insert(reservation_on(AvailabilityPeriodId::new(), "g", 2, 4))
            .await;
        assert!(matches!(missing, Err(BookingError::NotFound(_))));

        let outside = ledger.insert(reservation_on(period.id, "g", 8, 12)).await;
        assert!(matches!(outside, Err(BookingError::OutOfRange(_))));
        assert!(ledger.is_empty().unwrap());

        ledger.insert(reservation_on(period.id, "g", 2, 4)).await.unwrap();
    }

    #[tokio::test]
    async fn linked_store_keeps_reservations_inside_their_period() {
        let (store, ledger) = linked_backends();
        let acc = AccommodationId::new("acc-1");
        let period = store
            .insert_period(UserId::new("host-1"), new_period("acc-1", 1, 10, 50))
            .await
            .unwrap();
        ledger.insert(reservation_on(period.id, "g", 4, 6)).await.unwrap();

        let shrunk = AvailabilityPeriod {
            start_date: day(5),
            ..period.clone()
        };
        assert!(matches!(
            store.update_period(shrunk).await,
            Err(BookingError::Conflict(_))
        ));
        assert!(matches!(
            store.delete_period(&acc, period.id).await,
            Err(BookingError::Conflict(_))
        ));
        assert_eq!(store.get_period(&acc, period.id).await.unwrap(), Some(period.clone()));

        let widened = AvailabilityPeriod {
            end_date: day(12),
            ..period
        };
        store.update_period(widened).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_delete_and_insert_never_orphan_a_reservation() {
        for _ in 0..200 {
            let (store, ledger) = linked_backends();
            let acc = AccommodationId::new("acc-1");
            let period = store
                .insert_period(UserId::new("host-1"), new_period("acc-1", 1, 10, 50))
                .await
                .unwrap();
            let period_id = period.id;

            let delete = {
                let store = store.clone();
                let acc = acc.clone();
                tokio::spawn(async move { store.delete_period(&acc, period_id).await })
            };
            let insert = {
                let ledger = ledger.clone();
                tokio::spawn(async move {
                    ledger.insert(reservation_on(period_id, "g", 2, 4)).await
                })
            };
            let deleted = delete.await.unwrap().is_ok();
            let booked = insert.await.unwrap().is_ok();

            assert!(deleted != booked, "deleted={deleted} booked={booked}");
            let present = store.get_period(&acc, period_id).await.unwrap().is_some();
            assert_eq!(present, booked);
            assert_eq!(ledger.len().unwrap(), usize::from(booked));
        }
    }

    #[tokio::test]
    async fn inverted_period_is_rejected() {
        let store = InMemoryAvailabilityStore::new();
        let result = store
            .insert_period(UserId::new("host-1"), new_period("acc-1", 10, 1, 50))
            .await;
        assert!(matches!(result, Err(BookingError::Validation(_))));
    }
}
