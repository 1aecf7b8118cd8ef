//! Router configuration for the booking service.

use super::health::{health_check, readiness_check};
use super::state::AppState;
use crate::api::{availability, reservations};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use booking_web::correlation_id_layer;
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// Every request gets a correlation id (read from `X-Correlation-ID` or
/// generated) and a tracing span.
pub fn build_router(state: AppState) -> Router {
    let availability_routes = Router::new()
        .route("/accomm/availability", post(availability::create_period))
        .route(
            "/accomm/:accomm_id/availability",
            get(availability::list_periods),
        )
        .route(
            "/accomm/:accomm_id/availability/:period_id",
            put(availability::update_period).delete(availability::delete_period),
        )
        .route(
            "/accomm/:accomm_id/check",
            get(availability::check_accommodation),
        );

    let reservation_routes = Router::new()
        .route(
            "/availability/reservations",
            post(reservations::create_reservation),
        )
        .route(
            "/availability/:period_id/reservations",
            get(reservations::list_period_reservations),
        )
        .route(
            "/guest/:guest_id/reservations",
            get(reservations::list_guest_reservations),
        )
        .route(
            "/reservation/delete/:reservation_id",
            delete(reservations::delete_reservation),
        );

    Router::new()
        // Health checks (no authentication)
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .merge(availability_routes)
        .merge(reservation_routes)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}
