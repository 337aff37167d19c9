//! Command surface exposed to route handlers

mod availability;
mod bookings;
mod usage;

pub use availability::{get_availability, get_month_availability};
pub use bookings::{cancel_booking, create_booking, reschedule_booking, CreateBookingRequest};
pub use usage::get_usage_stats;
