//! HTTP handlers organized by resource.

pub mod availability;
pub mod reservations;

pub use availability::{check_accommodation, create_period, delete_period, list_periods, update_period};
pub use reservations::{
    create_reservation, delete_reservation, list_guest_reservations, list_period_reservations,
};
