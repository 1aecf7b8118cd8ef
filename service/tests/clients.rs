//! HTTP collaborator clients against a local fake upstream.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use booking_core::ports::{AccommodationDirectory, NotificationGateway};
use booking_core::{AccommodationId, BookingError, ReservationNotification, UserId};
use booking_runtime::{CircuitBreakerConfig, State as BreakerState};
use booking_service::clients::{HttpAccommodationDirectory, HttpNotificationGateway};
use booking_testing::fixtures::day;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
struct Upstream {
    received: Arc<Mutex<Vec<Value>>>,
    reject_notifications: Arc<AtomicBool>,
}

async fn accommodation(Path(id): Path<String>) -> Result<Json<Value>, StatusCode> {
    match id.as_str() {
        "acc-1" => Ok(Json(json!({
            "id": "acc-1",
            "owner": { "id": "host-1", "name": "Hannah" },
            "name": "Sea View",
            "rooms": 3
        }))),
        "broken" => Err(StatusCode::INTERNAL_SERVER_ERROR),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn notification(State(upstream): State<Upstream>, Json(body): Json<Value>) -> StatusCode {
    if upstream.reject_notifications.load(Ordering::SeqCst) {
        return StatusCode::BAD_REQUEST;
    }
    upstream.received.lock().unwrap().push(body);
    StatusCode::CREATED
}

async fn serve(upstream: Upstream) -> String {
    let app = Router::new()
        .route("/accommodations/:id", get(accommodation))
        .route("/notifications/new", post(notification))
        .with_state(upstream);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn breaker() -> CircuitBreakerConfig {
    CircuitBreakerConfig::builder()
        .failure_threshold(3)
        .cool_down(Duration::from_secs(60))
        .call_timeout(Duration::from_secs(2))
        .build()
}

#[tokio::test]
async fn directory_reads_owner_and_name() {
    let base = serve(Upstream::default()).await;
    let directory = HttpAccommodationDirectory::new(
        reqwest::Client::new(),
        format!("{base}/accommodations/"),
        breaker(),
    );

    let found = directory
        .get_accommodation(&AccommodationId::new("acc-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.owner_id, UserId::new("host-1"));
    assert_eq!(found.name, "Sea View");

    let missing = directory
        .get_accommodation(&AccommodationId::new("acc-2"))
        .await
        .unwrap();
    assert!(missing.is_none());
    assert_eq!(directory.breaker().state().await, BreakerState::Closed);
}

#[tokio::test]
async fn server_errors_open_the_breaker() {
    let base = serve(Upstream::default()).await;
    let directory =
        HttpAccommodationDirectory::new(reqwest::Client::new(), format!("{base}/accommodations"), breaker());
    let broken = AccommodationId::new("broken");

    for _ in 0..3 {
        let err = directory.get_accommodation(&broken).await.unwrap_err();
        assert!(matches!(err, BookingError::UpstreamUnavailable(_)));
    }
    assert_eq!(directory.breaker().state().await, BreakerState::Open);

    // Open circuit fails fast, even for a healthy listing
    let err = directory
        .get_accommodation(&AccommodationId::new("acc-1"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("circuit is open"), "{err}");
}

#[tokio::test]
async fn gateway_posts_host_text_and_time() {
    let upstream = Upstream::default();
    let base = serve(upstream.clone()).await;
    let gateway = HttpNotificationGateway::new(
        reqwest::Client::new(),
        &format!("{base}/notifications"),
        breaker(),
    );

    gateway
        .send_reservation_notification(ReservationNotification {
            host_id: UserId::new("host-1"),
            text: "Your accommodation Sea View has been reserved (by guest-g)".to_string(),
            time: day(1),
        })
        .await
        .unwrap();

    let received = upstream.received.lock().unwrap().clone();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0]["host"]["id"], "host-1");
    assert_eq!(
        received[0]["text"],
        "Your accommodation Sea View has been reserved (by guest-g)"
    );
    assert!(received[0]["time"].as_str().unwrap().starts_with("2024-01-01T00:00:00"));
}

#[tokio::test]
async fn rejected_notifications_do_not_trip_the_breaker() {
    let upstream = Upstream::default();
    upstream.reject_notifications.store(true, Ordering::SeqCst);
    let base = serve(upstream.clone()).await;
    let gateway = HttpNotificationGateway::new(
        reqwest::Client::new(),
        &format!("{base}/notifications"),
        breaker(),
    );
    let message = ReservationNotification {
        host_id: UserId::new("host-1"),
        text: "hello".to_string(),
        time: day(1),
    };

    for _ in 0..5 {
        assert!(gateway.send_reservation_notification(message.clone()).await.is_err());
    }
    assert_eq!(gateway.breaker().state().await, BreakerState::Closed);
}
