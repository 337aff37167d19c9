//! Booking lifecycle: create, cancel, reschedule

mod service;

pub use service::{BookingService, NewBooking};
