//! Mapping from database errors to [`BookingError`].

use booking_core::BookingError;

const EXCLUSION_VIOLATION: &str = "23P01";
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

/// Translate a sqlx error, keeping constraint violations meaningful.
pub(crate) fn map_db_error(context: &str, err: sqlx::Error) -> BookingError {
    if let sqlx::Error::Database(db) = &err {
        match db.code().as_deref() {
            Some(EXCLUSION_VIOLATION) => {
                return BookingError::Conflict(format!("{context}: dates overlap an existing booking"));
            }
            Some(UNIQUE_VIOLATION) => {
                return BookingError::Conflict(format!("{context}: record already exists"));
            }
            Some(FOREIGN_KEY_VIOLATION) => {
                return BookingError::Conflict(format!(
                    "{context}: referenced by or referencing a missing record"
                ));
            }
            Some(CHECK_VIOLATION) => {
                return BookingError::Validation(format!("{context}: {}", db.message()));
            }
            _ => {}
        }
    }
    BookingError::Storage(format!("{context}: {err}"))
}
