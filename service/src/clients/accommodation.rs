//! Accommodation service client.

use super::{ClientError, upstream_error};
use booking_core::ports::{AccommodationDirectory, BoxFuture};
use booking_core::{Accommodation, AccommodationId, Result, UserId};
use booking_runtime::{CircuitBreaker, CircuitBreakerConfig};
use reqwest::StatusCode;
use serde::Deserialize;

const SERVICE: &str = "accommodation service";

#[derive(Debug, Deserialize)]
struct OwnerBody {
    id: String,
}

/// The fields we read from `GET {uri}/{id}`; everything else is ignored.
#[derive(Debug, Deserialize)]
struct AccommodationBody {
    id: String,
    owner: OwnerBody,
    name: String,
}

impl From<AccommodationBody> for Accommodation {
    fn from(body: AccommodationBody) -> Self {
        Self {
            id: AccommodationId::new(body.id),
            owner_id: UserId::new(body.owner.id),
            name: body.name,
        }
    }
}

/// [`AccommodationDirectory`] over HTTP, behind a circuit breaker.
#[derive(Debug, Clone)]
pub struct HttpAccommodationDirectory {
    client: reqwest::Client,
    base_uri: String,
    breaker: CircuitBreaker,
}

impl HttpAccommodationDirectory {
    /// Create a client for the service at `base_uri`.
    #[must_use]
    pub fn new(client: reqwest::Client, base_uri: impl Into<String>, breaker: CircuitBreakerConfig) -> Self {
        Self {
            client,
            base_uri: base_uri.into().trim_end_matches('/').to_string(),
            breaker: CircuitBreaker::new("accommodation_service", breaker),
        }
    }

    /// The breaker guarding this client.
    #[must_use]
    pub const fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    async fn fetch(&self, url: &str) -> std::result::Result<Option<Accommodation>, ClientError> {
        let response = self.client.get(url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: AccommodationBody = response.json().await?;
                Ok(Some(body.into()))
            }
            status => Err(ClientError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            }),
        }
    }

    async fn lookup(&self, accommodation_id: AccommodationId) -> Result<Option<Accommodation>> {
        let url = format!("{}/{}", self.base_uri, accommodation_id);
        self.breaker
            .call_classified(|| self.fetch(&url), ClientError::trips_breaker)
            .await
            .map_err(|err| {
                tracing::warn!(
                    accommodation_id = %accommodation_id,
                    error = %err,
                    "Accommodation lookup failed"
                );
                upstream_error(SERVICE, err)
            })
    }
}

impl AccommodationDirectory for HttpAccommodationDirectory {
    fn get_accommodation(
        &self,
        accommodation_id: &AccommodationId,
    ) -> BoxFuture<'_, Option<Accommodation>> {
        Box::pin(self.lookup(accommodation_id.clone()))
    }
}
