//! Booking commands

use hourglass_core::NewBooking;
use hourglass_domain::{Booking, HourglassError, Result};
use serde::Deserialize;
use uuid::Uuid;

use crate::context::SchedulerContext;
use crate::validation::{parse_slot, validate_email, validate_slug};

/// Booking creation payload as received from the edge.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub event_slug: String,
    pub start_time: String,
    pub end_time: String,
    pub attendee_name: String,
    pub attendee_email: String,
    #[serde(default)]
    pub notes: Option<String>,
}

pub async fn create_booking(
    ctx: &SchedulerContext,
    request: CreateBookingRequest,
) -> Result<Booking> {
    validate_slug(&request.event_slug)?;
    validate_email(&request.attendee_email)?;
    if request.attendee_name.trim().is_empty() {
        return Err(HourglassError::InvalidInput("attendee name is required".into()));
    }
    let slot = parse_slot(&request.start_time, &request.end_time)?;

    ctx.bookings
        .create(NewBooking {
            event_slug: request.event_slug,
            slot,
            attendee_name: request.attendee_name.trim().to_string(),
            attendee_email: request.attendee_email,
            notes: request.notes,
        })
        .await
}

pub async fn cancel_booking(ctx: &SchedulerContext, booking_id: &str) -> Result<Booking> {
    let id = parse_booking_id(booking_id)?;
    ctx.bookings.cancel(id).await
}

pub async fn reschedule_booking(
    ctx: &SchedulerContext,
    booking_id: &str,
    start_time: &str,
    end_time: &str,
) -> Result<Booking> {
    let id = parse_booking_id(booking_id)?;
    let slot = parse_slot(start_time, end_time)?;
    ctx.bookings.reschedule(id, slot).await
}

fn parse_booking_id(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| HourglassError::InvalidInput(format!("invalid booking id: {value}")))
}
