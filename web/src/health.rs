//! Health check responses.
//!
//! Used by load balancers and orchestrators. Liveness never touches
//! dependencies; readiness renders a [`HealthReport`] assembled by the
//! application.

use axum::{Json, http::StatusCode};
use booking_runtime::{HealthReport, HealthStatus};
use serde::Serialize;

/// Body of the liveness endpoint.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Liveness {
    /// Always `"ok"` while the process can answer
    pub status: &'static str,
    /// Service version
    pub version: &'static str,
}

/// Liveness response for a service at `version`.
///
/// ```text
/// GET /health
/// {"status":"ok","version":"0.1.0"}
/// ```
#[must_use]
pub const fn liveness(version: &'static str) -> Json<Liveness> {
    Json(Liveness {
        status: "ok",
        version,
    })
}

/// Readiness response.
///
/// # Status Codes
///
/// - 200 OK: Healthy or Degraded
/// - 503 Service Unavailable: Unhealthy
#[must_use]
pub fn readiness(report: HealthReport) -> (StatusCode, Json<HealthReport>) {
    let status = match report.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use booking_runtime::HealthCheck;

    #[test]
    fn test_liveness_body() {
        let Json(body) = liveness("1.2.3");
        assert_eq!(body.status, "ok");
        assert_eq!(body.version, "1.2.3");
    }

    #[test]
    fn test_degraded_is_still_ready() {
        let report = HealthReport::new(vec![
            HealthCheck::healthy("storage"),
            HealthCheck::degraded("notification_service", "breaker open"),
        ]);
        let (status, _) = readiness(report);
        assert_eq!(status, StatusCode::OK);
    }

    #[test]
    fn test_unhealthy_is_503() {
        let report = HealthReport::new(vec![HealthCheck::unhealthy("storage", "ping failed")]);
        let (status, Json(body)) = readiness(report);
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, HealthStatus::Unhealthy);
    }
}
