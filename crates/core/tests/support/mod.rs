//! Shared in-memory fakes and harness for core integration tests.

pub mod calendar;
pub mod repositories;

use std::sync::Arc;

use chrono::NaiveTime;
use hourglass_common::cache::{MemoryKvStore, TieredCache};
use hourglass_common::testing::MockClock;
use hourglass_core::ports::{BusyCalendarProvider, Notifier};
use hourglass_core::{
    AvailabilityService, BookingService, DailyLimits, MonitorConfig, UsageMonitor,
};
use hourglass_domain::{AvailabilityRule, CalendarPreference, EventType, HostProfile};

use calendar::StaticBusyProvider;
use repositories::{
    FakeBookingRepository, FakeEventTypeRepository, FakeHostRepository, FakeRuleRepository,
    RecordingNotifier, RecordingUsageRepository,
};

pub const HOST_ID: &str = "host-1";
pub const EVENT_SLUG: &str = "intro-call";

pub fn host_profile() -> HostProfile {
    HostProfile {
        id: HOST_ID.to_string(),
        email: "host@example.com".to_string(),
        name: "Hourglass Host".to_string(),
        timezone: "America/New_York".to_string(),
        default_calendar_preference: CalendarPreference::Both,
    }
}

pub fn intro_call_event() -> EventType {
    EventType {
        id: "et-1".to_string(),
        user_id: HOST_ID.to_string(),
        slug: EVENT_SLUG.to_string(),
        name: "Intro Call".to_string(),
        duration_minutes: 30,
        is_active: true,
        calendar_preference: None,
    }
}

/// Monday 09:00–17:00 local.
pub fn monday_business_hours() -> Vec<AvailabilityRule> {
    vec![AvailabilityRule {
        day_of_week: 1,
        start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
    }]
}

/// Everything a test needs, wired the way the application context wires it.
pub struct Harness {
    pub clock: MockClock,
    pub cache: Arc<TieredCache>,
    pub availability: AvailabilityService,
    pub bookings_service: BookingService,
    pub rules: Arc<FakeRuleRepository>,
    pub bookings: Arc<FakeBookingRepository>,
    pub google: Arc<StaticBusyProvider>,
    pub outlook: Arc<StaticBusyProvider>,
    pub notifier: Arc<RecordingNotifier>,
    pub usage: Arc<RecordingUsageRepository>,
}

pub fn harness() -> Harness {
    harness_with_limits(DailyLimits {
        kv_read: 1_000_000,
        kv_write: 1_000_000,
        db_query: 1_000_000,
        external_query: 1_000_000,
    })
}

pub fn harness_with_limits(limits: DailyLimits) -> Harness {
    let clock = MockClock::default();
    let kv = Arc::new(MemoryKvStore::with_clock(Arc::new(clock.clone())));
    let cache = Arc::new(TieredCache::with_clock(kv, Arc::new(clock.clone())));

    let usage = Arc::new(RecordingUsageRepository::default());
    let monitor = Arc::new(UsageMonitor::new(
        Arc::clone(&cache),
        usage.clone(),
        MonitorConfig { daily_limits: limits, ..MonitorConfig::default() },
        Arc::new(clock.clone()),
    ));

    let rules = Arc::new(FakeRuleRepository::new(monday_business_hours()));
    let bookings = Arc::new(FakeBookingRepository::default());
    let event_types = Arc::new(FakeEventTypeRepository::new(vec![intro_call_event()]));
    let host = Arc::new(FakeHostRepository::new(host_profile()));
    let google = Arc::new(StaticBusyProvider::google());
    let outlook = Arc::new(StaticBusyProvider::outlook());
    let notifier = Arc::new(RecordingNotifier::default());

    let providers: Vec<Arc<dyn BusyCalendarProvider>> =
        vec![google.clone(), outlook.clone()];

    let availability = AvailabilityService::new(
        Arc::clone(&cache),
        Arc::clone(&monitor),
        rules.clone(),
        bookings.clone(),
        event_types.clone(),
        host.clone(),
        providers.clone(),
        Arc::new(clock.clone()),
    );

    let bookings_service = BookingService::new(
        bookings.clone(),
        event_types,
        host,
        providers,
        notifier.clone() as Arc<dyn Notifier>,
        Arc::clone(&cache),
    );

    Harness {
        clock,
        cache,
        availability,
        bookings_service,
        rules,
        bookings,
        google,
        outlook,
        notifier,
        usage,
    }
}
