//! Reservations table.

use crate::error::map_db_error;
use booking_core::ports::{BoxFuture, ReservationLedger};
use booking_core::{
    AccommodationId, AvailabilityPeriodId, BookingError, Reservation, ReservationId, Result,
    UserId,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const RESERVATION_COLUMNS: &str = "id, availability_period_id, accommodation_id, host_id, \
     guest_id, start_date, end_date, guest_count, price";

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    availability_period_id: Uuid,
    accommodation_id: String,
    host_id: String,
    guest_id: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    guest_count: i32,
    price: i64,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = BookingError;

    fn try_from(row: ReservationRow) -> Result<Self> {
        let guest_count = u32::try_from(row.guest_count).map_err(|_| {
            BookingError::Storage(format!(
                "reservation {} has invalid guest count {}",
                row.id, row.guest_count
            ))
        })?;
        Ok(Self {
            id: ReservationId::from_uuid(row.id),
            availability_period_id: AvailabilityPeriodId::from_uuid(row.availability_period_id),
            accommodation_id: AccommodationId::new(row.accommodation_id),
            host_id: UserId::new(row.host_id),
            guest_id: UserId::new(row.guest_id),
            start_date: row.start_date,
            end_date: row.end_date,
            guest_count,
            price: row.price,
        })
    }
}

fn into_reservations(rows: Vec<ReservationRow>) -> Result<Vec<Reservation>> {
    rows.into_iter().map(Reservation::try_from).collect()
}

/// `PostgreSQL`-backed [`ReservationLedger`].
///
/// Inserts run in a transaction that share-locks the parent period, so a
/// concurrent period update cannot strand the new reservation, and the
/// `reservations_no_overlap` exclusion constraint settles races between
/// overlapping inserts.
#[derive(Clone, Debug)]
pub struct PostgresReservationLedger {
    pool: PgPool,
}

impl PostgresReservationLedger {
    /// Use an existing pool. Run [`migrate`](crate::migrate) first.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn insert_reservation(&self, reservation: Reservation) -> Result<Reservation> {
        let guest_count = i32::try_from(reservation.guest_count).map_err(|_| {
            BookingError::Validation(format!("guest count {} is too large", reservation.guest_count))
        })?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_db_error("Failed to begin transaction", e))?;

        let bounds: Option<(DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
            "SELECT start_date, end_date FROM availability_periods
             WHERE id = $1
             FOR SHARE",
        )
        .bind(reservation.availability_period_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_db_error("Failed to lock availability period", e))?;

        let Some((period_start, period_end)) = bounds else {
            return Err(BookingError::not_found(
                "Availability period",
                reservation.availability_period_id,
            ));
        };
        if !(period_start < reservation.start_date && reservation.end_date < period_end) {
            return Err(BookingError::OutOfRange(format!(
                "reservation must fall strictly within {period_start} to {period_end}"
            )));
        }

        sqlx::query(
            "INSERT INTO reservations
                 (id, availability_period_id, accommodation_id, host_id, guest_id,
                  start_date, end_date, guest_count, price)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(reservation.id.as_uuid())
        .bind(reservation.availability_period_id.as_uuid())
        .bind(reservation.accommodation_id.as_str())
        .bind(reservation.host_id.as_str())
        .bind(reservation.guest_id.as_str())
        .bind(reservation.start_date)
        .bind(reservation.end_date)
        .bind(guest_count)
        .bind(reservation.price)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_db_error("Failed to insert reservation", e))?;

        tx.commit()
            .await
            .map_err(|e| map_db_error("Failed to commit reservation", e))?;

        tracing::debug!(
            reservation_id = %reservation.id,
            period_id = %reservation.availability_period_id,
            "Inserted reservation"
        );
        Ok(reservation)
    }

    async fn by_period(&self, period_id: AvailabilityPeriodId) -> Result<Vec<Reservation>> {
        let query = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations
             WHERE availability_period_id = $1
             ORDER BY start_date"
        );
        let rows: Vec<ReservationRow> = sqlx::query_as(&query)
            .bind(period_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error("Failed to list reservations by period", e))?;
        into_reservations(rows)
    }

    async fn by_guest(&self, guest_id: UserId) -> Result<Vec<Reservation>> {
        let query = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations
             WHERE guest_id = $1
             ORDER BY start_date"
        );
        let rows: Vec<ReservationRow> = sqlx::query_as(&query)
            .bind(guest_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error("Failed to list reservations by guest", e))?;
        into_reservations(rows)
    }

    async fn for_guest(
        &self,
        reservation_id: ReservationId,
        guest_id: UserId,
    ) -> Result<Option<Reservation>> {
        let query = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations
             WHERE id = $1 AND guest_id = $2"
        );
        let row: Option<ReservationRow> = sqlx::query_as(&query)
            .bind(reservation_id.as_uuid())
            .bind(guest_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error("Failed to load reservation", e))?;
        row.map(Reservation::try_from).transpose()
    }

    async fn overlapping(
        &self,
        period_id: AvailabilityPeriodId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reservation>> {
        let query = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations
             WHERE availability_period_id = $1
               AND start_date < $3
               AND end_date > $2
             ORDER BY start_date"
        );
        let rows: Vec<ReservationRow> = sqlx::query_as(&query)
            .bind(period_id.as_uuid())
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error("Failed to query overlapping reservations", e))?;
        into_reservations(rows)
    }

    async fn ending_after(&self, accommodation_id: AccommodationId, now: DateTime<Utc>) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (
                 SELECT 1 FROM reservations
                 WHERE accommodation_id = $1 AND end_date > $2
             )",
        )
        .bind(accommodation_id.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error("Failed to check active reservations", e))?;
        Ok(exists)
    }

    async fn remove(&self, reservation_id: ReservationId) -> Result<()> {
        let result = sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(reservation_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_error("Failed to delete reservation", e))?;

        if result.rows_affected() == 0 {
            return Err(BookingError::not_found("Reservation", reservation_id));
        }
        Ok(())
    }
}

impl ReservationLedger for PostgresReservationLedger {
    fn insert(&self, reservation: Reservation) -> BoxFuture<'_, Reservation> {
        Box::pin(self.insert_reservation(reservation))
    }

    fn list_by_period(&self, period_id: AvailabilityPeriodId) -> BoxFuture<'_, Vec<Reservation>> {
        Box::pin(self.by_period(period_id))
    }

    fn list_by_guest(&self, guest_id: &UserId) -> BoxFuture<'_, Vec<Reservation>> {
        Box::pin(self.by_guest(guest_id.clone()))
    }

    fn get_for_guest(
        &self,
        reservation_id: ReservationId,
        guest_id: &UserId,
    ) -> BoxFuture<'_, Option<Reservation>> {
        Box::pin(self.for_guest(reservation_id, guest_id.clone()))
    }

    fn find_overlapping(
        &self,
        period_id: AvailabilityPeriodId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<Reservation>> {
        Box::pin(self.overlapping(period_id, start, end))
    }

    fn any_ending_after(
        &self,
        accommodation_id: &AccommodationId,
        now: DateTime<Utc>,
    ) -> BoxFuture<'_, bool> {
        Box::pin(self.ending_after(accommodation_id.clone(), now))
    }

    fn delete(&self, reservation_id: ReservationId) -> BoxFuture<'_, ()> {
        Box::pin(self.remove(reservation_id))
    }

    fn ping(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(|e| map_db_error("Database ping failed", e))?;
            Ok(())
        })
    }
}
