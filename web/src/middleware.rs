//! Correlation id tracking.
//!
//! 1. **Extract** the id from the `X-Correlation-ID` header (or generate a UUID)
//! 2. **Store** it in request extensions for [`CorrelationId`](crate::CorrelationId)
//! 3. **Run** the request inside an `http_request` span carrying the id
//! 4. **Echo** it on the response header
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/health", get(health))
//!     .layer(correlation_id_layer());
//! ```

use axum::{extract::Request, http::HeaderValue, response::Response};
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Request and response header carrying the id.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Wrap a router so every request carries a correlation id.
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// Tags each request with a correlation id. See [`correlation_id_layer`].
#[derive(Clone, Copy, Debug)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Service produced by [`CorrelationIdLayer`].
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

pub(crate) fn parse_header(value: Option<&HeaderValue>) -> Option<Uuid> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let id = parse_header(req.headers().get(CORRELATION_ID_HEADER)).unwrap_or_else(Uuid::new_v4);
        req.extensions_mut().insert(id);

        let span = tracing::info_span!(
            "http_request",
            correlation_id = %id,
            method = %req.method(),
            path = %req.uri().path(),
            status = tracing::field::Empty,
        );
        let pending = self.inner.call(req).instrument(span.clone());

        Box::pin(async move {
            let mut response = pending.await?;
            span.record("status", response.status().as_u16());
            // A hyphenated UUID is always a valid header value.
            if let Ok(value) = HeaderValue::try_from(id.to_string()) {
                response.headers_mut().insert(CORRELATION_ID_HEADER, value);
            }
            Ok(response)
        })
    }
}
