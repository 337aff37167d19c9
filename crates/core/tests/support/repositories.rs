//! In-memory repository fakes.

use async_trait::async_trait;
use chrono::NaiveDate;
use hourglass_core::ports::{
    BookingRepository, EventTypeRepository, HostRepository, Notifier, RuleRepository,
    UsageRepository,
};
use hourglass_domain::{
    AvailabilityRule, Booking, BookingStatus, EventType, HostProfile, HourglassError, Result,
    TimeSlot, UsageCounter,
};
use parking_lot::Mutex;
use uuid::Uuid;

pub struct FakeHostRepository {
    host: HostProfile,
}

impl FakeHostRepository {
    pub fn new(host: HostProfile) -> Self {
        Self { host }
    }
}

#[async_trait]
impl HostRepository for FakeHostRepository {
    async fn host(&self) -> Result<Option<HostProfile>> {
        Ok(Some(self.host.clone()))
    }
}

pub struct FakeRuleRepository {
    rules: Mutex<Vec<AvailabilityRule>>,
}

impl FakeRuleRepository {
    pub fn new(rules: Vec<AvailabilityRule>) -> Self {
        Self { rules: Mutex::new(rules) }
    }

    pub fn set_rules(&self, rules: Vec<AvailabilityRule>) {
        *self.rules.lock() = rules;
    }
}

#[async_trait]
impl RuleRepository for FakeRuleRepository {
    async fn rules_for_user(&self, _user_id: &str) -> Result<Vec<AvailabilityRule>> {
        Ok(self.rules.lock().clone())
    }

    async fn replace_rules(&self, _user_id: &str, rules: &[AvailabilityRule]) -> Result<()> {
        *self.rules.lock() = rules.to_vec();
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeBookingRepository {
    bookings: Mutex<Vec<Booking>>,
}

impl FakeBookingRepository {
    pub fn all(&self) -> Vec<Booking> {
        self.bookings.lock().clone()
    }
}

#[async_trait]
impl BookingRepository for FakeBookingRepository {
    async fn confirmed_slots_on(&self, user_id: &str, date: NaiveDate) -> Result<Vec<TimeSlot>> {
        Ok(self
            .bookings
            .lock()
            .iter()
            .filter(|b| {
                b.user_id == user_id
                    && b.status == BookingStatus::Confirmed
                    && b.start_time.date_naive() == date
            })
            .map(Booking::slot)
            .collect())
    }

    async fn confirmed_slots_in(&self, user_id: &str, range: TimeSlot) -> Result<Vec<TimeSlot>> {
        Ok(self
            .bookings
            .lock()
            .iter()
            .filter(|b| {
                b.user_id == user_id
                    && b.status == BookingStatus::Confirmed
                    && b.start_time >= range.start
                    && b.start_time < range.end
            })
            .map(Booking::slot)
            .collect())
    }

    async fn find_conflicting(
        &self,
        user_id: &str,
        slot: TimeSlot,
        exclude: Option<Uuid>,
    ) -> Result<Option<Uuid>> {
        Ok(self
            .bookings
            .lock()
            .iter()
            .find(|b| {
                b.user_id == user_id
                    && b.status == BookingStatus::Confirmed
                    && Some(b.id) != exclude
                    && b.slot().overlaps(&slot)
            })
            .map(|b| b.id))
    }

    async fn insert(&self, booking: &Booking) -> Result<()> {
        self.bookings.lock().push(booking.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>> {
        Ok(self.bookings.lock().iter().find(|b| b.id == id).cloned())
    }

    async fn update_status(&self, id: Uuid, status: BookingStatus) -> Result<()> {
        let mut bookings = self.bookings.lock();
        let booking = bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| HourglassError::NotFound(format!("booking not found: {id}")))?;
        booking.status = status;
        Ok(())
    }

    async fn update_slot(&self, id: Uuid, slot: TimeSlot, status: BookingStatus) -> Result<()> {
        let mut bookings = self.bookings.lock();
        let booking = bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| HourglassError::NotFound(format!("booking not found: {id}")))?;
        booking.start_time = slot.start;
        booking.end_time = slot.end;
        booking.status = status;
        Ok(())
    }

    async fn set_external_ref(&self, id: Uuid, external_ref: &str) -> Result<()> {
        let mut bookings = self.bookings.lock();
        let booking = bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| HourglassError::NotFound(format!("booking not found: {id}")))?;
        booking.external_event_ref = Some(external_ref.to_string());
        Ok(())
    }
}

pub struct FakeEventTypeRepository {
    events: Vec<EventType>,
}

impl FakeEventTypeRepository {
    pub fn new(events: Vec<EventType>) -> Self {
        Self { events }
    }
}

#[async_trait]
impl EventTypeRepository for FakeEventTypeRepository {
    async fn find_active_by_slug(&self, user_id: &str, slug: &str) -> Result<Option<EventType>> {
        Ok(self
            .events
            .iter()
            .find(|e| e.user_id == user_id && e.slug == slug && e.is_active)
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<EventType>> {
        Ok(self.events.iter().find(|e| e.id == id).cloned())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<EventType>> {
        Ok(self.events.iter().filter(|e| e.user_id == user_id).cloned().collect())
    }
}

#[derive(Default)]
pub struct RecordingUsageRepository {
    pub snapshots: Mutex<Vec<UsageCounter>>,
}

#[async_trait]
impl UsageRepository for RecordingUsageRepository {
    async fn upsert_snapshot(&self, counter: &UsageCounter) -> Result<()> {
        self.snapshots.lock().push(counter.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub confirmed: Mutex<Vec<Booking>>,
    pub canceled: Mutex<Vec<Booking>>,
    pub rescheduled: Mutex<Vec<Booking>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn booking_confirmed(&self, booking: &Booking) -> Result<()> {
        self.confirmed.lock().push(booking.clone());
        Ok(())
    }

    async fn booking_canceled(&self, booking: &Booking) -> Result<()> {
        self.canceled.lock().push(booking.clone());
        Ok(())
    }

    async fn booking_rescheduled(&self, booking: &Booking) -> Result<()> {
        self.rescheduled.lock().push(booking.clone());
        Ok(())
    }
}
