//! Stand-ins for the accommodation and notification services.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)]

use booking_core::ports::{AccommodationDirectory, BoxFuture, NotificationGateway};
use booking_core::{Accommodation, AccommodationId, BookingError, ReservationNotification};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Accommodation directory backed by a map.
///
/// Flip [`set_unavailable`](Self::set_unavailable) to simulate an outage.
#[derive(Clone, Debug, Default)]
pub struct MockAccommodationDirectory {
    listings: Arc<Mutex<HashMap<AccommodationId, Accommodation>>>,
    unavailable: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl MockAccommodationDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listing.
    #[must_use]
    pub fn with(self, accommodation: Accommodation) -> Self {
        self.add(accommodation);
        self
    }

    /// Register a listing on a shared directory.
    pub fn add(&self, accommodation: Accommodation) {
        self.listings
            .lock()
            .unwrap()
            .insert(accommodation.id.clone(), accommodation);
    }

    /// Make every lookup fail with `UpstreamUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of lookups made.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AccommodationDirectory for MockAccommodationDirectory {
    fn get_accommodation(
        &self,
        accommodation_id: &AccommodationId,
    ) -> BoxFuture<'_, Option<Accommodation>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = if self.unavailable.load(Ordering::SeqCst) {
            Err(BookingError::UpstreamUnavailable(
                "accommodation service unavailable".to_string(),
            ))
        } else {
            Ok(self.listings.lock().unwrap().get(accommodation_id).cloned())
        };
        Box::pin(async move { result })
    }
}

/// Notification gateway that records what it was asked to send.
#[derive(Clone, Debug, Default)]
pub struct RecordingNotificationGateway {
    sent: Arc<Mutex<Vec<ReservationNotification>>>,
    failing: Arc<AtomicBool>,
    attempts: Arc<AtomicUsize>,
}

impl RecordingNotificationGateway {
    /// Create a gateway that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every delivery fail with `UpstreamUnavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Notifications delivered so far.
    #[must_use]
    pub fn sent(&self) -> Vec<ReservationNotification> {
        self.sent.lock().unwrap().clone()
    }

    /// Delivery attempts, including failed ones.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl NotificationGateway for RecordingNotificationGateway {
    fn send_reservation_notification(
        &self,
        notification: ReservationNotification,
    ) -> BoxFuture<'_, ()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let result = if self.failing.load(Ordering::SeqCst) {
            Err(BookingError::UpstreamUnavailable(
                "notification service unavailable".to_string(),
            ))
        } else {
            self.sent.lock().unwrap().push(notification);
            Ok(())
        };
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{accommodation, day};
    use booking_core::UserId;

    #[tokio::test]
    async fn directory_answers_and_fails_on_demand() {
        let directory =
            MockAccommodationDirectory::new().with(accommodation("acc-1", "host-1", "Sea View"));

        let found = directory
            .get_accommodation(&AccommodationId::new("acc-1"))
            .await
            .unwrap();
        assert_eq!(found.map(|a| a.name), Some("Sea View".to_string()));
        assert!(directory
            .get_accommodation(&AccommodationId::new("missing"))
            .await
            .unwrap()
            .is_none());

        directory.set_unavailable(true);
        assert!(matches!(
            directory.get_accommodation(&AccommodationId::new("acc-1")).await,
            Err(BookingError::UpstreamUnavailable(_))
        ));
        assert_eq!(directory.calls(), 3);
    }

    #[tokio::test]
    async fn gateway_records_deliveries() {
        let gateway = RecordingNotificationGateway::new();
        let note = ReservationNotification {
            host_id: UserId::new("host-1"),
            text: "hello".to_string(),
            time: day(1),
        };

        gateway.send_reservation_notification(note.clone()).await.unwrap();
        gateway.set_failing(true);
        assert!(gateway.send_reservation_notification(note.clone()).await.is_err());

        assert_eq!(gateway.sent(), vec![note]);
        assert_eq!(gateway.attempts(), 2);
    }
}
