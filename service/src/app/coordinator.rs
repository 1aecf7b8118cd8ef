//! Booking coordinator: the read-validate-write sequences behind every endpoint.
//!
//! Each operation is independent. Checks made here (overlap, containment,
//! stranded reservations) are advisory; the storage commit is the authority
//! and its `Conflict` is passed through unchanged.

use super::notifier::{NotificationStatus, Notifier};
use booking_core::environment::Clock;
use booking_core::overlap::OverlapChecker;
use booking_core::ports::{AccommodationDirectory, AvailabilityStore, ReservationLedger};
use booking_core::pricing::compute_price;
use booking_core::{
    Accommodation, AccommodationId, AvailabilityPeriod, AvailabilityPeriodId, BookingError, DateRange,
    NewAvailabilityPeriod, NewReservation, PeriodChanges, Reservation, ReservationId,
    ReservationNotification, Result, UserId,
};
use booking_runtime::metrics::BookingMetrics;
use std::sync::Arc;
use std::time::Instant;

/// Storage, collaborators and clock the coordinator works against.
pub struct Dependencies {
    /// Availability periods
    pub periods: Arc<dyn AvailabilityStore>,
    /// Reservations
    pub ledger: Arc<dyn ReservationLedger>,
    /// Listings service
    pub directory: Arc<dyn AccommodationDirectory>,
    /// Host notifications
    pub notifier: Notifier,
    /// Source of "now"
    pub clock: Arc<dyn Clock>,
}

/// Coordinates periods, reservations and the collaborators around them.
pub struct BookingCoordinator {
    periods: Arc<dyn AvailabilityStore>,
    ledger: Arc<dyn ReservationLedger>,
    overlap: OverlapChecker,
    directory: Arc<dyn AccommodationDirectory>,
    notifier: Notifier,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for BookingCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingCoordinator")
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}

impl BookingCoordinator {
    /// Build a coordinator over `deps`.
    #[must_use]
    pub fn new(deps: Dependencies) -> Self {
        Self {
            overlap: OverlapChecker::new(Arc::clone(&deps.ledger)),
            periods: deps.periods,
            ledger: deps.ledger,
            directory: deps.directory,
            notifier: deps.notifier,
            clock: deps.clock,
        }
    }

    /// Current time according to the injected clock.
    #[must_use]
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Open a new availability period on an accommodation the host owns.
    ///
    /// The listings service is consulted before anything is written.
    ///
    /// # Errors
    ///
    /// - `Validation`: inverted bounds or negative price
    /// - `UpstreamUnavailable`: listings service unreachable or breaker open
    /// - `NotFound`: the listings service does not know the accommodation
    /// - `Forbidden`: the accommodation belongs to another host
    /// - `Conflict`: overlaps another period of the accommodation
    #[tracing::instrument(skip(self, new), fields(accommodation_id = %new.accommodation_id))]
    pub async fn create_period(
        &self,
        host_id: &UserId,
        new: NewAvailabilityPeriod,
    ) -> Result<AvailabilityPeriod> {
        new.validate()?;
        self.require_owner(&new.accommodation_id, host_id).await?;

        let period = self.periods.insert_period(host_id.clone(), new).await?;
        BookingMetrics::record_period_created();
        tracing::info!(period_id = %period.id, "Availability period created");
        Ok(period)
    }

    /// Periods of an accommodation, ordered by start date.
    ///
    /// # Errors
    ///
    /// - `Storage`: backend failure
    pub async fn list_periods(&self, accommodation_id: &AccommodationId) -> Result<Vec<AvailabilityPeriod>> {
        self.periods.list_by_accommodation(accommodation_id).await
    }

    /// Change the bounds or pricing of a period.
    ///
    /// Existing reservations are not repriced.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such period on the accommodation
    /// - `Forbidden`: the period belongs to another host
    /// - `Validation`: inverted bounds or negative price
    /// - `Conflict`: a reservation would no longer fit strictly inside the
    ///   new bounds, or the new bounds overlap another period
    #[tracing::instrument(skip(self, changes))]
    pub async fn update_period(
        &self,
        host_id: &UserId,
        accommodation_id: &AccommodationId,
        period_id: AvailabilityPeriodId,
        changes: PeriodChanges,
    ) -> Result<AvailabilityPeriod> {
        let current = self.owned_period(host_id, accommodation_id, period_id).await?;

        let range = DateRange::new(changes.start_date, changes.end_date)?;
        if changes.unit_price < 0 {
            return Err(BookingError::Validation(
                "unit price must not be negative".to_string(),
            ));
        }

        let reservations = self.ledger.list_by_period(period_id).await?;
        for reservation in &reservations {
            if !range.strictly_contains(&reservation.range()?) {
                return Err(BookingError::Conflict(format!(
                    "reservation {} ({} to {}) would fall outside the new bounds",
                    reservation.id, reservation.start_date, reservation.end_date
                )));
            }
        }

        let updated = AvailabilityPeriod {
            start_date: changes.start_date,
            end_date: changes.end_date,
            unit_price: changes.unit_price,
            is_price_per_guest: changes.is_price_per_guest,
            ..current
        };
        let updated = self.periods.update_period(updated).await?;
        tracing::info!("Availability period updated");
        Ok(updated)
    }

    /// Remove a period that has no reservations.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such period on the accommodation
    /// - `Forbidden`: the period belongs to another host
    /// - `Conflict`: reservations still reference the period
    #[tracing::instrument(skip(self))]
    pub async fn delete_period(
        &self,
        host_id: &UserId,
        accommodation_id: &AccommodationId,
        period_id: AvailabilityPeriodId,
    ) -> Result<()> {
        self.owned_period(host_id, accommodation_id, period_id).await?;

        let reservations = self.ledger.list_by_period(period_id).await?;
        if !reservations.is_empty() {
            return Err(BookingError::Conflict(format!(
                "availability period {period_id} still has {} reservation(s)",
                reservations.len()
            )));
        }

        self.periods.delete_period(accommodation_id, period_id).await?;
        tracing::info!("Availability period deleted");
        Ok(())
    }

    /// Book a stay inside an availability period.
    ///
    /// The listings service is consulted before anything is written. The host
    /// is notified afterwards; the notification outcome never changes the
    /// booking result.
    ///
    /// # Errors
    ///
    /// - `Validation`: inverted bounds, zero guests, stay shorter than a day,
    ///   or a price that overflows
    /// - `UpstreamUnavailable`: listings service unreachable or breaker open
    /// - `Conflict`: another reservation on the period intersects the stay
    /// - `NotFound`: unknown accommodation, or no such period on it
    /// - `OutOfRange`: the stay is not strictly inside the period
    #[tracing::instrument(skip(self, new), fields(period_id = %new.availability_period_id))]
    pub async fn insert_reservation(
        &self,
        guest_id: &UserId,
        new: NewReservation,
    ) -> Result<(Reservation, NotificationStatus)> {
        let started = Instant::now();
        let stay = new.validate()?;
        let accommodation = self.require_accommodation(&new.accommodation_id).await?;

        if !self
            .overlap
            .is_available(new.availability_period_id, stay.start(), stay.end())
            .await?
        {
            BookingMetrics::record_conflict();
            return Err(BookingError::Conflict(format!(
                "dates {} to {} are already reserved",
                stay.start(),
                stay.end()
            )));
        }

        let period = self
            .periods
            .get_period(&new.accommodation_id, new.availability_period_id)
            .await?
            .ok_or_else(|| BookingError::not_found("Availability period", new.availability_period_id))?;

        if !period.range()?.strictly_contains(&stay) {
            return Err(BookingError::OutOfRange(format!(
                "dates {} to {} are outside the availability period ({} to {})",
                stay.start(),
                stay.end(),
                period.start_date,
                period.end_date
            )));
        }

        let price = compute_price(
            stay.start(),
            stay.end(),
            period.is_price_per_guest,
            period.unit_price,
            new.guest_count,
        )?;

        let reservation = Reservation {
            id: ReservationId::new(),
            availability_period_id: period.id,
            accommodation_id: period.accommodation_id,
            host_id: period.host_id,
            guest_id: guest_id.clone(),
            start_date: stay.start(),
            end_date: stay.end(),
            guest_count: new.guest_count,
            price,
        };

        let reservation = self
            .ledger
            .insert(reservation)
            .await
            .inspect_err(|err| {
                if matches!(err, BookingError::Conflict(_)) {
                    BookingMetrics::record_conflict();
                }
            })?;
        BookingMetrics::record_reservation_created(started.elapsed());
        tracing::info!(reservation_id = %reservation.id, price, "Reservation created");

        let message = ReservationNotification::reserved(
            reservation.host_id.clone(),
            &accommodation.name,
            guest_id,
            self.clock.now(),
        );
        let notification = self.notifier.notify(message).await;

        Ok((reservation, notification))
    }

    /// Cancel a guest's reservation before the stay begins.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such reservation for this guest
    /// - `ActiveReservation`: the stay has already begun
    #[tracing::instrument(skip(self))]
    pub async fn delete_reservation(
        &self,
        guest_id: &UserId,
        reservation_id: ReservationId,
    ) -> Result<NotificationStatus> {
        let reservation = self
            .ledger
            .get_for_guest(reservation_id, guest_id)
            .await?
            .ok_or_else(|| BookingError::not_found("Reservation", reservation_id))?;

        let now = self.clock.now();
        if !reservation.is_cancellable(now) {
            return Err(BookingError::ActiveReservation(format!(
                "reservation {reservation_id} started on {}",
                reservation.start_date
            )));
        }

        self.ledger.delete(reservation_id).await?;
        BookingMetrics::record_cancellation();
        tracing::info!("Reservation cancelled");

        let status = match self.accommodation_name(&reservation.accommodation_id).await {
            Some(name) => {
                let message = ReservationNotification::cancelled(&reservation, &name, now);
                self.notifier.notify(message).await
            }
            None => NotificationStatus::Skipped,
        };
        Ok(status)
    }

    /// Reservations under a period, ordered by start date.
    ///
    /// # Errors
    ///
    /// - `Storage`: backend failure
    pub async fn list_period_reservations(&self, period_id: AvailabilityPeriodId) -> Result<Vec<Reservation>> {
        self.ledger.list_by_period(period_id).await
    }

    /// A guest's reservations, ordered by start date.
    ///
    /// # Errors
    ///
    /// - `Storage`: backend failure
    pub async fn list_guest_reservations(&self, guest_id: &UserId) -> Result<Vec<Reservation>> {
        self.ledger.list_by_guest(guest_id).await
    }

    /// Succeeds when no reservation on the accommodation ends in the future.
    ///
    /// # Errors
    ///
    /// - `Conflict`: at least one reservation ends after now
    pub async fn check_accommodation(&self, accommodation_id: &AccommodationId) -> Result<()> {
        if self
            .ledger
            .any_ending_after(accommodation_id, self.clock.now())
            .await?
        {
            return Err(BookingError::Conflict(format!(
                "accommodation {accommodation_id} has active reservations"
            )));
        }
        Ok(())
    }

    /// Probe both storage ports.
    ///
    /// # Errors
    ///
    /// - `Storage`: a backend is unreachable
    pub async fn ping_storage(&self) -> Result<()> {
        self.periods.ping().await?;
        self.ledger.ping().await
    }

    async fn require_accommodation(&self, accommodation_id: &AccommodationId) -> Result<Accommodation> {
        self.directory
            .get_accommodation(accommodation_id)
            .await?
            .ok_or_else(|| BookingError::not_found("Accommodation", accommodation_id))
    }

    async fn require_owner(&self, accommodation_id: &AccommodationId, host_id: &UserId) -> Result<()> {
        let accommodation = self.require_accommodation(accommodation_id).await?;

        if &accommodation.owner_id != host_id {
            return Err(BookingError::Forbidden(format!(
                "accommodation {accommodation_id} belongs to another host"
            )));
        }
        Ok(())
    }

    async fn owned_period(
        &self,
        host_id: &UserId,
        accommodation_id: &AccommodationId,
        period_id: AvailabilityPeriodId,
    ) -> Result<AvailabilityPeriod> {
        let period = self
            .periods
            .get_period(accommodation_id, period_id)
            .await?
            .ok_or_else(|| BookingError::not_found("Availability period", period_id))?;

        if &period.host_id != host_id {
            return Err(BookingError::Forbidden(format!(
                "availability period {period_id} belongs to another host"
            )));
        }
        Ok(period)
    }

    async fn accommodation_name(&self, accommodation_id: &AccommodationId) -> Option<String> {
        match self.directory.get_accommodation(accommodation_id).await {
            Ok(Some(accommodation)) => Some(accommodation.name),
            Ok(None) => {
                tracing::warn!(%accommodation_id, "Accommodation vanished; notification skipped");
                None
            }
            Err(err) => {
                tracing::warn!(%accommodation_id, error = %err, "Notification skipped");
                None
            }
        }
    }
}
