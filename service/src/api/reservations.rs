//! Reservation endpoints.
//!
//! - GET /availability/:period_id/reservations - stays under a period
//! - POST /availability/reservations - book a stay (guest)
//! - GET /guest/:guest_id/reservations - a guest's stays
//! - DELETE /reservation/delete/:reservation_id - cancel before check-in (guest)
//!
//! Every reservation is returned with its derived `phase`
//! (`upcoming`, `in_progress` or `completed`), computed from the clock at
//! request time.

use crate::app::NotificationStatus;
use crate::server::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    Json,
};
use booking_core::{
    AvailabilityPeriodId, DateTime, NewReservation, Reservation, ReservationId, ReservationPhase,
    UserId, Utc,
};
use booking_web::{AppError, Caller, Role};
use serde::Serialize;

/// A reservation as the API shows it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationView {
    /// Stored record
    #[serde(flatten)]
    pub reservation: Reservation,
    /// Position of the stay relative to now
    pub phase: ReservationPhase,
}

impl ReservationView {
    fn at(reservation: Reservation, now: DateTime<Utc>) -> Self {
        Self {
            phase: reservation.phase(now),
            reservation,
        }
    }

    fn all(reservations: Vec<Reservation>, now: DateTime<Utc>) -> Vec<Self> {
        reservations
            .into_iter()
            .map(|reservation| Self::at(reservation, now))
            .collect()
    }
}

/// Response after booking a stay.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedReservation {
    /// The booked stay
    #[serde(flatten)]
    pub view: ReservationView,
    /// Whether the host has been told yet
    pub notification: NotificationStatus,
}

/// Response after cancelling a stay.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelledReservation {
    /// Cancelled reservation
    pub reservation_id: ReservationId,
    /// Whether the host has been told yet
    pub notification: NotificationStatus,
}

/// List stays under an availability period.
pub async fn list_period_reservations(
    path: Result<Path<AvailabilityPeriodId>, PathRejection>,
    State(state): State<AppState>,
) -> Result<Json<Vec<ReservationView>>, AppError> {
    let Path(period_id) = path?;
    let reservations = state.coordinator.list_period_reservations(period_id).await?;
    Ok(Json(ReservationView::all(reservations, state.coordinator.now())))
}

/// List a guest's stays.
pub async fn list_guest_reservations(
    path: Result<Path<UserId>, PathRejection>,
    State(state): State<AppState>,
) -> Result<Json<Vec<ReservationView>>, AppError> {
    let Path(guest_id) = path?;
    let reservations = state.coordinator.list_guest_reservations(&guest_id).await?;
    Ok(Json(ReservationView::all(reservations, state.coordinator.now())))
}

/// Book a stay inside an availability period.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8081/availability/reservations \
///   -H "Authorization: Bearer <token>" \
///   -H "Content-Type: application/json" \
///   -d '{
///     "availabilityPeriodId": "550e8400-e29b-41d4-a716-446655440000",
///     "accommodationId": "acc-1",
///     "startDate": "2024-01-02T00:00:00Z",
///     "endDate": "2024-01-04T00:00:00Z",
///     "guestCount": 2
///   }'
/// ```
///
/// Response (`201`):
/// ```json
/// {
///   "id": "660e8400-e29b-41d4-a716-446655440001",
///   "price": 100,
///   "phase": "upcoming",
///   "notification": "sent",
///   ...
/// }
/// ```
pub async fn create_reservation(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<NewReservation>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedReservation>), AppError> {
    caller.require(Role::Guest)?;
    let Json(request) = body?;

    let (reservation, notification) = state
        .coordinator
        .insert_reservation(&caller.user_id, request)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedReservation {
            view: ReservationView::at(reservation, state.coordinator.now()),
            notification,
        }),
    ))
}

/// Cancel one of the caller's stays before it begins.
pub async fn delete_reservation(
    path: Result<Path<ReservationId>, PathRejection>,
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<CancelledReservation>, AppError> {
    caller.require(Role::Guest)?;
    let Path(reservation_id) = path?;

    let notification = state
        .coordinator
        .delete_reservation(&caller.user_id, reservation_id)
        .await?;
    Ok(Json(CancelledReservation {
        reservation_id,
        notification,
    }))
}
