//! `PostgreSQL` storage for availability periods and reservations.
//!
//! Implements [`AvailabilityStore`](booking_core::ports::AvailabilityStore)
//! and [`ReservationLedger`](booking_core::ports::ReservationLedger) over a
//! shared sqlx pool:
//!
//! - One `reservations` table; the by-period, by-guest and date-range paths
//!   are b-tree indexes over it
//! - GiST exclusion constraints reject overlapping reservations (per period)
//!   and overlapping periods (per accommodation) at commit time
//! - Embedded migrations via [`migrate`]
//!
//! # Example
//!
//! ```no_run
//! use booking_postgres::{PoolSettings, PostgresReservationLedger, connect, migrate};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = connect("postgres://localhost/booking", &PoolSettings::default()).await?;
//! migrate(&pool).await?;
//! let ledger = PostgresReservationLedger::new(pool);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod availability;
mod error;
mod ledger;

pub use availability::PostgresAvailabilityStore;
pub use ledger::PostgresReservationLedger;

use booking_core::{BookingError, Result};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

/// Connection pool sizing.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// Upper bound on open connections
    pub max_connections: u32,
    /// Connections kept warm
    pub min_connections: u32,
    /// How long to wait for a free connection (also the connect timeout)
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Open a connection pool.
///
/// # Errors
///
/// Returns [`BookingError::Storage`] if the database cannot be reached.
pub async fn connect(database_url: &str, settings: &PoolSettings) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.acquire_timeout)
        .connect(database_url)
        .await
        .map_err(|e| BookingError::Storage(format!("Failed to connect to database: {e}")))
}

/// Apply the embedded schema migrations.
///
/// # Errors
///
/// Returns [`BookingError::Storage`] if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| BookingError::Storage(format!("Migration failed: {e}")))?;
    tracing::info!("Database migrations applied");
    Ok(())
}
