//! Booking creation, cancellation, and reschedule
//!
//! Unlike availability reads, booking writes fail hard on a real conflict
//! or validation problem - silent degradation here would double-book.
//! Calendar mirroring and notifications are best-effort side effects: their
//! failure is logged and the booking stands.

use std::sync::Arc;

use chrono::NaiveDate;
use hourglass_common::cache::{CacheStrategy, TieredCache};
use hourglass_domain::{
    Booking, BookingStatus, EventType, HostProfile, HourglassError, ProviderKind, Result,
    TimeSlot,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::ports::{
    BookingRepository, BusyCalendarProvider, CalendarEventRequest, EventTypeRepository,
    HostRepository, Notifier,
};

/// Request to allocate a slot.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub event_slug: String,
    pub slot: TimeSlot,
    pub attendee_name: String,
    pub attendee_email: String,
    pub notes: Option<String>,
}

/// Allocates, cancels, and moves bookings.
#[derive(Clone)]
pub struct BookingService {
    bookings: Arc<dyn BookingRepository>,
    event_types: Arc<dyn EventTypeRepository>,
    host: Arc<dyn HostRepository>,
    providers: Arc<Vec<Arc<dyn BusyCalendarProvider>>>,
    notifier: Arc<dyn Notifier>,
    cache: Arc<TieredCache>,
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        event_types: Arc<dyn EventTypeRepository>,
        host: Arc<dyn HostRepository>,
        providers: Vec<Arc<dyn BusyCalendarProvider>>,
        notifier: Arc<dyn Notifier>,
        cache: Arc<TieredCache>,
    ) -> Self {
        Self {
            bookings,
            event_types,
            host,
            providers: Arc::new(providers),
            notifier,
            cache,
        }
    }

    /// Allocate a slot.
    ///
    /// The conflict check and the insert are two separate store operations;
    /// a genuine race window exists between them under concurrent requests
    /// for the same slot. The check uses the same half-open overlap
    /// predicate as the slot generator, so anything offered as free here is
    /// rejected if it stopped being free.
    pub async fn create(&self, request: NewBooking) -> Result<Booking> {
        if request.slot.is_empty() || request.slot.end < request.slot.start {
            return Err(HourglassError::InvalidInput("booking interval is empty".into()));
        }

        let host = self.load_host().await?;
        let event = self
            .event_types
            .find_active_by_slug(&host.id, &request.event_slug)
            .await?
            .ok_or_else(|| {
                HourglassError::NotFound(format!(
                    "event type not found or inactive: {}",
                    request.event_slug
                ))
            })?;

        if self.bookings.find_conflicting(&host.id, request.slot, None).await?.is_some() {
            return Err(HourglassError::Conflict(
                "this time slot is no longer available".into(),
            ));
        }

        let mut booking = Booking {
            id: Uuid::new_v4(),
            user_id: host.id.clone(),
            event_type_id: event.id.clone(),
            start_time: request.slot.start,
            end_time: request.slot.end,
            attendee_name: request.attendee_name.clone(),
            attendee_email: request.attendee_email.clone(),
            status: BookingStatus::Confirmed,
            external_event_ref: None,
        };
        self.bookings.insert(&booking).await?;
        info!(booking_id = %booking.id, slot = %booking.start_time, "booking created");

        // Mirror onto the host calendar; the booking stands even if this
        // fails
        if let Some(event_ref) = self.mirror_event(&host, &event, &booking, &request.notes).await {
            if let Err(e) = self.bookings.set_external_ref(booking.id, &event_ref).await {
                warn!(booking_id = %booking.id, error = %e, "failed to persist external event ref");
            }
            booking.external_event_ref = Some(event_ref);
        }

        if let Err(e) = self.notifier.booking_confirmed(&booking).await {
            warn!(booking_id = %booking.id, error = %e, "confirmation notification failed");
        }

        self.invalidate_availability(&event.slug, booking.start_time.date_naive()).await;
        Ok(booking)
    }

    /// Cancel a booking. Cancellation is terminal: a canceled booking
    /// cannot transition again.
    pub async fn cancel(&self, id: Uuid) -> Result<Booking> {
        let mut booking = self.load_booking(id).await?;
        if booking.status == BookingStatus::Canceled {
            return Err(HourglassError::Conflict("booking is already canceled".into()));
        }

        self.bookings.update_status(id, BookingStatus::Canceled).await?;
        booking.status = BookingStatus::Canceled;
        info!(booking_id = %id, "booking canceled");

        if let Some(event_ref) = booking.external_event_ref.clone() {
            if let Err(e) = self.delete_mirrored_event(&event_ref).await {
                warn!(booking_id = %id, error = %e, "failed to delete mirrored calendar event");
            }
        }

        if let Err(e) = self.notifier.booking_canceled(&booking).await {
            warn!(booking_id = %id, error = %e, "cancellation notification failed");
        }

        if let Some(slug) = self.event_slug_for(&booking).await {
            self.invalidate_availability(&slug, booking.start_time.date_naive()).await;
        }
        Ok(booking)
    }

    /// Move a confirmed booking to a new slot.
    ///
    /// The booking passes through `rescheduled` and lands back at
    /// `confirmed` on the new time; the target slot gets a fresh conflict
    /// check that ignores the booking itself.
    pub async fn reschedule(&self, id: Uuid, new_slot: TimeSlot) -> Result<Booking> {
        if new_slot.is_empty() {
            return Err(HourglassError::InvalidInput("booking interval is empty".into()));
        }

        let mut booking = self.load_booking(id).await?;
        if booking.status != BookingStatus::Confirmed {
            return Err(HourglassError::Conflict(format!(
                "only confirmed bookings can be rescheduled (status: {})",
                booking.status.as_str()
            )));
        }

        if self
            .bookings
            .find_conflicting(&booking.user_id, new_slot, Some(id))
            .await?
            .is_some()
        {
            return Err(HourglassError::Conflict(
                "the requested time slot is no longer available".into(),
            ));
        }

        let old_date = booking.start_time.date_naive();
        self.bookings.update_status(id, BookingStatus::Rescheduled).await?;
        self.bookings.update_slot(id, new_slot, BookingStatus::Confirmed).await?;
        booking.start_time = new_slot.start;
        booking.end_time = new_slot.end;
        booking.status = BookingStatus::Confirmed;
        info!(booking_id = %id, new_start = %new_slot.start, "booking rescheduled");

        if let Some(event_ref) = booking.external_event_ref.clone() {
            if let Err(e) = self.update_mirrored_event(&event_ref, new_slot).await {
                warn!(booking_id = %id, error = %e, "failed to move mirrored calendar event");
            }
        }

        if let Err(e) = self.notifier.booking_rescheduled(&booking).await {
            warn!(booking_id = %id, error = %e, "reschedule notification failed");
        }

        if let Some(slug) = self.event_slug_for(&booking).await {
            self.invalidate_availability(&slug, old_date).await;
            self.invalidate_availability(&slug, new_slot.start.date_naive()).await;
        }
        Ok(booking)
    }

    async fn load_host(&self) -> Result<HostProfile> {
        self.host
            .host()
            .await?
            .ok_or_else(|| HourglassError::NotFound("host profile not configured".into()))
    }

    async fn load_booking(&self, id: Uuid) -> Result<Booking> {
        self.bookings
            .find_by_id(id)
            .await?
            .ok_or_else(|| HourglassError::NotFound(format!("booking not found: {id}")))
    }

    /// Create the mirrored calendar event on the preferred provider.
    async fn mirror_event(
        &self,
        host: &HostProfile,
        event: &EventType,
        booking: &Booking,
        notes: &Option<String>,
    ) -> Option<String> {
        let provider = self.pick_provider(event, host)?;

        let mut description =
            format!("Attendee: {} ({})", booking.attendee_name, booking.attendee_email);
        if let Some(notes) = notes {
            description.push_str("\n\nNotes from attendee:\n");
            description.push_str(notes);
        }
        let request = CalendarEventRequest {
            summary: format!("{} with {}", event.name, booking.attendee_name),
            description,
            slot: booking.slot(),
            attendee_email: booking.attendee_email.clone(),
        };

        match provider.create_event(&request).await {
            Ok(event_ref) => Some(tag_event_ref(provider.kind(), &event_ref)),
            Err(e) => {
                warn!(
                    provider = provider.kind().as_str(),
                    error = %e,
                    "calendar event creation failed, booking stands"
                );
                None
            }
        }
    }

    async fn update_mirrored_event(&self, event_ref: &str, slot: TimeSlot) -> Result<()> {
        for provider in self.providers.iter() {
            if let Some(stripped) = strip_provider_prefix(event_ref, provider.kind()) {
                return provider.update_event(stripped, slot).await;
            }
        }
        Ok(())
    }

    async fn delete_mirrored_event(&self, event_ref: &str) -> Result<()> {
        for provider in self.providers.iter() {
            if let Some(stripped) = strip_provider_prefix(event_ref, provider.kind()) {
                return provider.delete_event(stripped).await;
            }
        }
        Ok(())
    }

    fn pick_provider(
        &self,
        event: &EventType,
        host: &HostProfile,
    ) -> Option<&Arc<dyn BusyCalendarProvider>> {
        let preference =
            event.calendar_preference.unwrap_or(host.default_calendar_preference);
        self.providers.iter().find(|p| preference.includes(p.kind()))
    }

    async fn event_slug_for(&self, booking: &Booking) -> Option<String> {
        match self.event_types.find_by_id(&booking.event_type_id).await {
            Ok(Some(event)) => Some(event.slug),
            Ok(None) => None,
            Err(e) => {
                warn!(booking_id = %booking.id, error = %e, "event type lookup failed");
                None
            }
        }
    }

    /// Drop the cached artifacts a booking change invalidates: the date's
    /// availability, its bookings list, and the month scan containing it.
    async fn invalidate_availability(&self, event_slug: &str, date: NaiveDate) {
        self.cache.delete(&CacheStrategy::availability(event_slug, date).key).await;
        self.cache.delete(&CacheStrategy::bookings(date).key).await;
        let month = date.format("%Y-%m").to_string();
        self.cache.delete(&CacheStrategy::month_availability(event_slug, &month).key).await;
    }
}

/// Mirrored event refs are stored as `{provider}:{id}` so the right
/// provider can be addressed later.
fn tag_event_ref(kind: ProviderKind, id: &str) -> String {
    format!("{}:{id}", kind.as_str())
}

fn strip_provider_prefix(event_ref: &str, kind: ProviderKind) -> Option<&str> {
    event_ref.strip_prefix(kind.as_str()).and_then(|rest| rest.strip_prefix(':'))
}
