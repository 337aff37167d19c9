//! Port interfaces implemented by the infrastructure layer

use async_trait::async_trait;
use chrono::NaiveDate;
use hourglass_domain::{
    AvailabilityRule, Booking, BookingStatus, EventType, HostProfile, ProviderKind, Result,
    TimeSlot, UsageCounter,
};
use uuid::Uuid;

/// Event payload for mirroring a booking onto the host's calendar.
#[derive(Debug, Clone)]
pub struct CalendarEventRequest {
    pub summary: String,
    pub description: String,
    pub slot: TimeSlot,
    pub attendee_email: String,
}

/// A busy-time source: one connected external calendar.
///
/// Implementations obtain their own valid access credential (refreshing an
/// expired one) and perform one bounded network call per invocation.
/// Callers must treat any error as "this provider contributes nothing" -
/// a provider failure never aborts an availability computation.
#[async_trait]
pub trait BusyCalendarProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Busy intervals within `range`, normalized to UTC, filtered to
    /// busy/tentative statuses.
    async fn busy_times(&self, range: TimeSlot) -> Result<Vec<TimeSlot>>;

    /// Create the mirrored event; returns the provider's event reference.
    async fn create_event(&self, request: &CalendarEventRequest) -> Result<String>;

    /// Move an existing mirrored event to a new time.
    async fn update_event(&self, event_ref: &str, slot: TimeSlot) -> Result<()>;

    /// Delete a mirrored event. Deleting an already-gone event is not an
    /// error.
    async fn delete_event(&self, event_ref: &str) -> Result<()>;
}

/// Weekly availability rules. The rule set is replaced wholesale on save.
#[async_trait]
pub trait RuleRepository: Send + Sync {
    async fn rules_for_user(&self, user_id: &str) -> Result<Vec<AvailabilityRule>>;

    async fn replace_rules(&self, user_id: &str, rules: &[AvailabilityRule]) -> Result<()>;
}

/// Booking persistence and conflict queries.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// `[start, end)` intervals of confirmed bookings whose start falls on
    /// the given UTC date.
    async fn confirmed_slots_on(&self, user_id: &str, date: NaiveDate) -> Result<Vec<TimeSlot>>;

    /// Confirmed booking intervals starting within `range`.
    async fn confirmed_slots_in(&self, user_id: &str, range: TimeSlot) -> Result<Vec<TimeSlot>>;

    /// First confirmed booking overlapping `slot`, if any, skipping
    /// `exclude` (used when rescheduling a booking against itself).
    async fn find_conflicting(
        &self,
        user_id: &str,
        slot: TimeSlot,
        exclude: Option<Uuid>,
    ) -> Result<Option<Uuid>>;

    async fn insert(&self, booking: &Booking) -> Result<()>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>>;

    async fn update_status(&self, id: Uuid, status: BookingStatus) -> Result<()>;

    /// Move a booking to a new interval, setting its status in the same
    /// write.
    async fn update_slot(&self, id: Uuid, slot: TimeSlot, status: BookingStatus) -> Result<()>;

    async fn set_external_ref(&self, id: Uuid, external_ref: &str) -> Result<()>;
}

/// Event type lookups.
#[async_trait]
pub trait EventTypeRepository: Send + Sync {
    async fn find_active_by_slug(&self, user_id: &str, slug: &str) -> Result<Option<EventType>>;

    async fn find_by_id(&self, id: &str) -> Result<Option<EventType>>;

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<EventType>>;
}

/// The host account (single-host deployment).
#[async_trait]
pub trait HostRepository: Send + Sync {
    async fn host(&self) -> Result<Option<HostProfile>>;
}

/// Durable sink for sampled usage-counter snapshots (upsert by
/// date + class). Intentionally lossy telemetry, not an audit log.
#[async_trait]
pub trait UsageRepository: Send + Sync {
    async fn upsert_snapshot(&self, counter: &UsageCounter) -> Result<()>;
}

/// Notification dispatch keyed off booking state transitions.
///
/// Fire-and-forget at the call sites: a notification failure never rolls
/// back the transition that triggered it.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn booking_confirmed(&self, booking: &Booking) -> Result<()>;

    async fn booking_canceled(&self, booking: &Booking) -> Result<()>;

    async fn booking_rescheduled(&self, booking: &Booking) -> Result<()>;
}
