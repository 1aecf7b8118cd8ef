//! Notification service client.

use super::{ClientError, upstream_error};
use booking_core::ports::{BoxFuture, NotificationGateway};
use booking_core::{ReservationNotification, Result};
use booking_runtime::{CircuitBreaker, CircuitBreakerConfig};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Serialize;

const SERVICE: &str = "notification service";

#[derive(Debug, Serialize)]
struct HostBody<'a> {
    id: &'a str,
}

/// `POST {uri}/new` payload.
#[derive(Debug, Serialize)]
struct NotificationBody<'a> {
    host: HostBody<'a>,
    text: &'a str,
    time: DateTime<Utc>,
}

/// [`NotificationGateway`] over HTTP, behind a circuit breaker.
#[derive(Debug, Clone)]
pub struct HttpNotificationGateway {
    client: reqwest::Client,
    endpoint: String,
    breaker: CircuitBreaker,
}

impl HttpNotificationGateway {
    /// Create a client for the service at `base_uri`.
    #[must_use]
    pub fn new(client: reqwest::Client, base_uri: &str, breaker: CircuitBreakerConfig) -> Self {
        Self {
            client,
            endpoint: format!("{}/new", base_uri.trim_end_matches('/')),
            breaker: CircuitBreaker::new("notification_service", breaker),
        }
    }

    /// The breaker guarding this client.
    #[must_use]
    pub const fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    async fn post(&self, notification: &ReservationNotification) -> std::result::Result<(), ClientError> {
        let body = NotificationBody {
            host: HostBody {
                id: notification.host_id.as_str(),
            },
            text: &notification.text,
            time: notification.time,
        };
        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        if response.status() == StatusCode::CREATED {
            Ok(())
        } else {
            Err(ClientError::Status {
                status: response.status().as_u16(),
                url: self.endpoint.clone(),
            })
        }
    }

    async fn deliver(&self, notification: ReservationNotification) -> Result<()> {
        self.breaker
            .call_classified(|| self.post(&notification), ClientError::trips_breaker)
            .await
            .map_err(|err| {
                tracing::debug!(host_id = %notification.host_id, error = %err, "Notification delivery failed");
                upstream_error(SERVICE, err)
            })
    }
}

impl NotificationGateway for HttpNotificationGateway {
    fn send_reservation_notification(
        &self,
        notification: ReservationNotification,
    ) -> BoxFuture<'_, ()> {
        Box::pin(self.deliver(notification))
    }
}
