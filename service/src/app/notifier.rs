//! Best-effort host notifications.

use booking_core::ReservationNotification;
use booking_core::ports::NotificationGateway;
use booking_runtime::metrics::{NotificationMetrics, NotificationOutcome};
use booking_runtime::{DispatcherConfig, DispatcherWorker, NotificationDispatcher};
use serde::Serialize;
use std::sync::Arc;

/// What happened to the notification that followed a booking change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    /// Delivered during the request.
    Sent,
    /// Handed to the background dispatcher for redelivery.
    Deferred,
    /// Not sent: the listing name was unavailable or the queue was full.
    Skipped,
}

/// Sends once inline, then falls back to the background dispatcher.
#[derive(Clone)]
pub struct Notifier {
    gateway: Arc<dyn NotificationGateway>,
    dispatcher: NotificationDispatcher<ReservationNotification>,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("queued", &self.dispatcher.depth())
            .finish_non_exhaustive()
    }
}

impl Notifier {
    /// Start the redelivery worker for `gateway`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        gateway: Arc<dyn NotificationGateway>,
        config: DispatcherConfig,
    ) -> (Self, DispatcherWorker) {
        let redeliver = Arc::clone(&gateway);
        let (dispatcher, worker) = NotificationDispatcher::spawn(config, move |notification: ReservationNotification| {
            let gateway = Arc::clone(&redeliver);
            async move { gateway.send_reservation_notification(notification).await }
        });
        (
            Self {
                gateway,
                dispatcher,
            },
            worker,
        )
    }

    /// Deliver `notification`, deferring it if the inline attempt fails.
    pub async fn notify(&self, notification: ReservationNotification) -> NotificationStatus {
        match self
            .gateway
            .send_reservation_notification(notification.clone())
            .await
        {
            Ok(()) => {
                NotificationMetrics::record(NotificationOutcome::Sent);
                NotificationStatus::Sent
            }
            Err(err) => {
                tracing::info!(
                    host_id = %notification.host_id,
                    error = %err,
                    "Notification deferred"
                );
                if self.dispatcher.enqueue(notification) {
                    NotificationStatus::Deferred
                } else {
                    NotificationStatus::Skipped
                }
            }
        }
    }
}
