//! Availability periods table.

use crate::error::map_db_error;
use booking_core::ports::{AvailabilityStore, BoxFuture};
use booking_core::{
    AccommodationId, AvailabilityPeriod, AvailabilityPeriodId, BookingError,
    NewAvailabilityPeriod, Result, UserId,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const PERIOD_COLUMNS: &str =
    "id, accommodation_id, host_id, start_date, end_date, unit_price, is_price_per_guest";

#[derive(sqlx::FromRow)]
struct PeriodRow {
    id: Uuid,
    accommodation_id: String,
    host_id: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    unit_price: i64,
    is_price_per_guest: bool,
}

impl From<PeriodRow> for AvailabilityPeriod {
    fn from(row: PeriodRow) -> Self {
        Self {
            id: AvailabilityPeriodId::from_uuid(row.id),
            accommodation_id: AccommodationId::new(row.accommodation_id),
            host_id: UserId::new(row.host_id),
            start_date: row.start_date,
            end_date: row.end_date,
            unit_price: row.unit_price,
            is_price_per_guest: row.is_price_per_guest,
        }
    }
}

/// `PostgreSQL`-backed [`AvailabilityStore`].
#[derive(Clone, Debug)]
pub struct PostgresAvailabilityStore {
    pool: PgPool,
}

impl PostgresAvailabilityStore {
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

    async fn insert(&self, host_id: UserId, new: NewAvailabilityPeriod) -> Result<AvailabilityPeriod> {
        new.validate()?;
        let period = new.into_period(host_id);

        sqlx::query(
            "INSERT INTO availability_periods
                 (id, accommodation_id, host_id, start_date, end_date, unit_price, is_price_per_guest)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(period.id.as_uuid())
        .bind(period.accommodation_id.as_str())
        .bind(period.host_id.as_str())
        .bind(period.start_date)
        .bind(period.end_date)
        .bind(period.unit_price)
        .bind(period.is_price_per_guest)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error("Failed to insert availability period", e))?;

        tracing::debug!(period_id = %period.id, accommodation_id = %period.accommodation_id, "Inserted availability period");
        Ok(period)
    }

    async fn get(
        &self,
        accommodation_id: AccommodationId,
        period_id: AvailabilityPeriodId,
    ) -> Result<Option<AvailabilityPeriod>> {
        let query = format!(
            "SELECT {PERIOD_COLUMNS} FROM availability_periods
             WHERE accommodation_id = $1 AND id = $2"
        );
        let row: Option<PeriodRow> = sqlx::query_as(&query)
            .bind(accommodation_id.as_str())
            .bind(period_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error("Failed to load availability period", e))?;
        Ok(row.map(Into::into))
    }

    async fn list(&self, accommodation_id: AccommodationId) -> Result<Vec<AvailabilityPeriod>> {
        let query = format!(
            "SELECT {PERIOD_COLUMNS} FROM availability_periods
             WHERE accommodation_id = $1
             ORDER BY start_date"
        );
        let rows: Vec<PeriodRow> = sqlx::query_as(&query)
            .bind(accommodation_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error("Failed to list availability periods", e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update(&self, period: AvailabilityPeriod) -> Result<AvailabilityPeriod> {
        period.range()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_db_error("Failed to begin transaction", e))?;

        let locked: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM availability_periods
             WHERE accommodation_id = $1 AND id = $2
             FOR UPDATE",
        )
        .bind(period.accommodation_id.as_str())
        .bind(period.id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_db_error("Failed to lock availability period", e))?;

        if locked.is_none() {
            return Err(BookingError::not_found("Availability period", period.id));
        }

        // Reservations must stay strictly inside the new bounds
        let (stranded,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM reservations
             WHERE availability_period_id = $1
               AND NOT (start_date > $2 AND end_date < $3)",
        )
        .bind(period.id.as_uuid())
        .bind(period.start_date)
        .bind(period.end_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_db_error("Failed to check reservations", e))?;

        if stranded > 0 {
            return Err(BookingError::Conflict(format!(
                "{stranded} reservation(s) would fall outside the new period bounds"
            )));
        }

        sqlx::query(
            "UPDATE availability_periods
             SET start_date = $3, end_date = $4, unit_price = $5, is_price_per_guest = $6,
                 updated_at = now()
             WHERE accommodation_id = $1 AND id = $2",
        )
        .bind(period.accommodation_id.as_str())
        .bind(period.id.as_uuid())
        .bind(period.start_date)
        .bind(period.end_date)
        .bind(period.unit_price)
        .bind(period.is_price_per_guest)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_db_error("Failed to update availability period", e))?;

        tx.commit()
            .await
            .map_err(|e| map_db_error("Failed to commit period update", e))?;

        Ok(period)
    }

    async fn delete(
        &self,
        accommodation_id: AccommodationId,
        period_id: AvailabilityPeriodId,
    ) -> Result<()> {
        let result = sqlx::query(
            "DELETE FROM availability_periods WHERE accommodation_id = $1 AND id = $2",
        )
        .bind(accommodation_id.as_str())
        .bind(period_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error("Failed to delete availability period", e))?;

        if result.rows_affected() == 0 {
            return Err(BookingError::not_found("Availability period", period_id));
        }
        Ok(())
    }
}

impl AvailabilityStore for PostgresAvailabilityStore {
    fn insert_period(
        &self,
        host_id: UserId,
        period: NewAvailabilityPeriod,
    ) -> BoxFuture<'_, AvailabilityPeriod> {
        Box::pin(self.insert(host_id, period))
    }

    fn get_period(
        &self,
        accommodation_id: &AccommodationId,
        period_id: AvailabilityPeriodId,
    ) -> BoxFuture<'_, Option<AvailabilityPeriod>> {
        Box::pin(self.get(accommodation_id.clone(), period_id))
    }

    fn list_by_accommodation(
        &self,
        accommodation_id: &AccommodationId,
    ) -> BoxFuture<'_, Vec<AvailabilityPeriod>> {
        Box::pin(self.list(accommodation_id.clone()))
    }

    fn update_period(&self, period: AvailabilityPeriod) -> BoxFuture<'_, AvailabilityPeriod> {
        Box::pin(self.update(period))
    }

    fn delete_period(
        &self,
        accommodation_id: &AccommodationId,
        period_id: AvailabilityPeriodId,
    ) -> BoxFuture<'_, ()> {
        Box::pin(self.delete(accommodation_id.clone(), period_id))
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
