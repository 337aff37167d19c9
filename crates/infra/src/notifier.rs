//! Tracing-backed notifier
//!
//! The notification port fires on booking state transitions; this default
//! implementation records them in the log stream. A mail-sending
//! implementation plugs in behind the same port.

use async_trait::async_trait;
use hourglass_core::ports::Notifier;
use hourglass_domain::{Booking, Result};
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn booking_confirmed(&self, booking: &Booking) -> Result<()> {
        info!(
            booking_id = %booking.id,
            attendee = %booking.attendee_email,
            start = %booking.start_time,
            "booking confirmed"
        );
        Ok(())
    }

    async fn booking_canceled(&self, booking: &Booking) -> Result<()> {
        info!(
            booking_id = %booking.id,
            attendee = %booking.attendee_email,
            "booking canceled"
        );
        Ok(())
    }

    async fn booking_rescheduled(&self, booking: &Booking) -> Result<()> {
        info!(
            booking_id = %booking.id,
            attendee = %booking.attendee_email,
            new_start = %booking.start_time,
            "booking rescheduled"
        );
        Ok(())
    }
}
