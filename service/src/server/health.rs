//! Health check endpoints for the booking service.

use super::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use booking_runtime::{HealthCheck, HealthReport};
use booking_web::health::{liveness, readiness, Liveness};

/// Liveness: the process is up. Never touches dependencies.
///
/// ```bash
/// curl http://localhost:8081/health
/// # {"status":"ok","version":"0.1.0"}
/// ```
pub async fn health_check() -> Json<Liveness> {
    liveness(env!("CARGO_PKG_VERSION"))
}

/// Readiness: storage answers, plus the state of each collaborator breaker.
///
/// An open breaker degrades the report but keeps the service ready; storage
/// failure answers `503`.
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let mut checks = Vec::with_capacity(state.breakers.len() + 1);

    checks.push(match state.coordinator.ping_storage().await {
        Ok(()) => HealthCheck::healthy("storage"),
        Err(err) => {
            tracing::warn!(error = %err, "Storage readiness probe failed");
            HealthCheck::unhealthy("storage", err.to_string())
        }
    });
    for breaker in state.breakers.iter() {
        checks.push(HealthCheck::from_breaker(breaker).await);
    }

    readiness(HealthReport::new(checks))
}
