//! Availability period endpoints.
//!
//! - GET /accomm/:accomm_id/availability - periods of an accommodation
//! - POST /accomm/availability - open a period (host)
//! - PUT /accomm/:accomm_id/availability/:period_id - change a period (host)
//! - DELETE /accomm/:accomm_id/availability/:period_id - remove a period (host)
//! - GET /accomm/:accomm_id/check - refuse while stays are still ahead

use crate::server::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    Json,
};
use booking_core::{AccommodationId, AvailabilityPeriod, AvailabilityPeriodId, NewAvailabilityPeriod, PeriodChanges};
use booking_web::{AppError, Caller, Role};
use serde::Serialize;

/// Answer of the accommodation check.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccommodationCheck {
    /// Always `false`; a pending stay answers `409` instead.
    pub has_active_reservations: bool,
}

/// List periods of an accommodation, ordered by start date.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8081/accomm/acc-1/availability
/// ```
pub async fn list_periods(
    path: Result<Path<AccommodationId>, PathRejection>,
    State(state): State<AppState>,
) -> Result<Json<Vec<AvailabilityPeriod>>, AppError> {
    let Path(accommodation_id) = path?;
    let periods = state.coordinator.list_periods(&accommodation_id).await?;
    Ok(Json(periods))
}

/// Open a period on an accommodation the caller owns.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8081/accomm/availability \
///   -H "Authorization: Bearer <token>" \
///   -H "Content-Type: application/json" \
///   -d '{
///     "accommodationId": "acc-1",
///     "startDate": "2024-01-01T00:00:00Z",
///     "endDate": "2024-01-10T00:00:00Z",
///     "unitPrice": 50,
///     "isPricePerGuest": false
///   }'
/// ```
pub async fn create_period(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<NewAvailabilityPeriod>, JsonRejection>,
) -> Result<(StatusCode, Json<AvailabilityPeriod>), AppError> {
    caller.require(Role::Host)?;
    let Json(request) = body?;

    let period = state
        .coordinator
        .create_period(&caller.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(period)))
}

/// Change the bounds or pricing of a period the caller owns.
pub async fn update_period(
    path: Result<Path<(AccommodationId, AvailabilityPeriodId)>, PathRejection>,
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<PeriodChanges>, JsonRejection>,
) -> Result<Json<AvailabilityPeriod>, AppError> {
    caller.require(Role::Host)?;
    let Path((accommodation_id, period_id)) = path?;
    let Json(changes) = body?;

    let period = state
        .coordinator
        .update_period(&caller.user_id, &accommodation_id, period_id, changes)
        .await?;
    Ok(Json(period))
}

/// Remove a period the caller owns. Refused while reservations remain.
pub async fn delete_period(
    path: Result<Path<(AccommodationId, AvailabilityPeriodId)>, PathRejection>,
    State(state): State<AppState>,
    caller: Caller,
) -> Result<StatusCode, AppError> {
    caller.require(Role::Host)?;
    let Path((accommodation_id, period_id)) = path?;

    state
        .coordinator
        .delete_period(&caller.user_id, &accommodation_id, period_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Called by the listings service before it deletes an accommodation.
pub async fn check_accommodation(
    path: Result<Path<AccommodationId>, PathRejection>,
    State(state): State<AppState>,
) -> Result<Json<AccommodationCheck>, AppError> {
    let Path(accommodation_id) = path?;
    state.coordinator.check_accommodation(&accommodation_id).await?;
    Ok(Json(AccommodationCheck {
        has_active_reservations: false,
    }))
}
