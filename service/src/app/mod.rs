//! Application layer: the booking coordinator and host notifications.
//!
//! The coordinator owns the read-validate-write sequences; the notifier makes
//! one inline delivery attempt and hands failures to the background
//! dispatcher.

mod coordinator;
mod notifier;

pub use coordinator::{BookingCoordinator, Dependencies};
pub use notifier::{NotificationStatus, Notifier};
