//! Availability orchestration: governor gate → cache → compute → cache write
//!
//! Control flow for a request: the usage governor is consulted first (at
//! the hard limit the service serves stale cache or fails retryably), then
//! the cache, then - under a per-key single flight - the actual
//! computation: rules ∩ provider busy time ∩ confirmed bookings through the
//! slot generator. Provider busy time is fetched and cached at ISO-week
//! granularity so day and month views share upstream calls.
//!
//! Availability never hard-fails because an upstream calendar is
//! unreachable; it degrades to rules+bookings-only or to stale cache.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Days, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use futures::FutureExt;
use hourglass_common::cache::{CacheStrategy, TieredCache};
use hourglass_common::sync::{BatchProcessor, Batcher, Coalescer};
use hourglass_common::testing::Clock;
use hourglass_domain::constants::{BATCH_WINDOW_MS, BOOKING_HORIZON_DAYS};
use hourglass_domain::{
    tz, AvailabilityRule, CalendarPreference, DayAvailability, EventType, HostProfile,
    HourglassError, MonthAvailability, ProviderKind, Result, TimeSlot, UsageClass,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::slots::{self, SlotQuery};
use crate::monitor::UsageMonitor;
use crate::ports::{
    BookingRepository, BusyCalendarProvider, EventTypeRepository, HostRepository, RuleRepository,
};

/// One ISO week of provider busy time, kept per-provider so a cached week
/// serves any calendar preference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekBusy {
    pub google: Vec<TimeSlot>,
    pub outlook: Vec<TimeSlot>,
}

impl WeekBusy {
    fn push(&mut self, kind: ProviderKind, mut busy: Vec<TimeSlot>) {
        match kind {
            ProviderKind::Google => self.google.append(&mut busy),
            ProviderKind::Outlook => self.outlook.append(&mut busy),
        }
    }

    /// Busy intervals of the providers a preference selects, unioned by
    /// concatenation.
    pub fn selected(&self, preference: CalendarPreference) -> Vec<TimeSlot> {
        let mut busy = Vec::new();
        if preference.includes(ProviderKind::Google) {
            busy.extend_from_slice(&self.google);
        }
        if preference.includes(ProviderKind::Outlook) {
            busy.extend_from_slice(&self.outlook);
        }
        busy
    }
}

/// Computes offerable time slots against rules, calendars, and bookings.
///
/// Explicitly constructed with its collaborators and shared by cloning;
/// nothing here is ambient global state.
#[derive(Clone)]
pub struct AvailabilityService {
    cache: Arc<TieredCache>,
    monitor: Arc<UsageMonitor>,
    day_flights: Arc<Coalescer<DayAvailability>>,
    month_flights: Arc<Coalescer<MonthAvailability>>,
    week_flights: Arc<Coalescer<WeekBusy>>,
    date_batcher: Arc<Batcher<NaiveDate, DayAvailability>>,
    rules: Arc<dyn RuleRepository>,
    bookings: Arc<dyn BookingRepository>,
    event_types: Arc<dyn EventTypeRepository>,
    host: Arc<dyn HostRepository>,
    providers: Arc<Vec<Arc<dyn BusyCalendarProvider>>>,
    clock: Arc<dyn Clock>,
}

impl AvailabilityService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cache: Arc<TieredCache>,
        monitor: Arc<UsageMonitor>,
        rules: Arc<dyn RuleRepository>,
        bookings: Arc<dyn BookingRepository>,
        event_types: Arc<dyn EventTypeRepository>,
        host: Arc<dyn HostRepository>,
        providers: Vec<Arc<dyn BusyCalendarProvider>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cache,
            monitor,
            day_flights: Arc::new(Coalescer::new()),
            month_flights: Arc::new(Coalescer::new()),
            week_flights: Arc::new(Coalescer::new()),
            date_batcher: Arc::new(Batcher::new()),
            rules,
            bookings,
            event_types,
            host,
            providers: Arc::new(providers),
            clock,
        }
    }

    /// Open slots for one date.
    pub async fn compute_availability(
        &self,
        event_slug: &str,
        date: NaiveDate,
        preference: Option<CalendarPreference>,
    ) -> Result<DayAvailability> {
        let strategy = CacheStrategy::availability(event_slug, date);

        if !self.monitor.track(UsageClass::KvRead).await {
            return self.stale_day(&strategy).await;
        }
        if let Some(hit) = self.cache.get::<DayAvailability>(&strategy).await {
            return Ok(hit);
        }

        let this = self.clone();
        let slug = event_slug.to_owned();
        self.day_flights
            .run(&strategy.key, move || async move {
                this.compute_day_fresh(&slug, date, preference).await
            })
            .await
    }

    /// Dates within one month (clipped to the booking horizon) that have at
    /// least one open slot.
    pub async fn compute_month_availability(
        &self,
        event_slug: &str,
        year: i32,
        month: u32,
        preference: Option<CalendarPreference>,
    ) -> Result<MonthAvailability> {
        let month_key = format!("{year:04}-{month:02}");
        let strategy = CacheStrategy::month_availability(event_slug, &month_key);

        if !self.monitor.track(UsageClass::KvRead).await {
            return self.stale_month(&strategy).await;
        }
        if let Some(hit) = self.cache.get::<MonthAvailability>(&strategy).await {
            return Ok(hit);
        }

        let this = self.clone();
        let slug = event_slug.to_owned();
        self.month_flights
            .run(&strategy.key, move || async move {
                this.compute_month_fresh(&slug, year, month, preference).await
            })
            .await
    }

    /// Availability for an arbitrary set of dates, grouped by ISO week so
    /// near-simultaneous per-date requests share one computation pass per
    /// week.
    pub async fn availability_for_dates(
        &self,
        event_slug: &str,
        dates: &[NaiveDate],
        preference: Option<CalendarPreference>,
    ) -> Result<Vec<DayAvailability>> {
        let processor: BatchProcessor<NaiveDate, DayAvailability> = {
            let this = self.clone();
            let slug = event_slug.to_owned();
            Arc::new(move |batch: Vec<NaiveDate>| {
                let this = this.clone();
                let slug = slug.clone();
                async move {
                    let mut out = Vec::with_capacity(batch.len());
                    for date in batch {
                        out.push(this.compute_availability(&slug, date, preference).await?);
                    }
                    Ok(out)
                }
                .boxed()
            })
        };

        let submissions = dates.iter().map(|&date| {
            let queue = format!("availability:{event_slug}:{}", tz::week_key(date));
            let batcher = Arc::clone(&self.date_batcher);
            let processor = Arc::clone(&processor);
            async move {
                batcher
                    .submit(&queue, date, processor, StdDuration::from_millis(BATCH_WINDOW_MS))
                    .await
            }
        });
        futures::future::try_join_all(submissions).await
    }

    async fn compute_day_fresh(
        &self,
        event_slug: &str,
        date: NaiveDate,
        preference: Option<CalendarPreference>,
    ) -> Result<DayAvailability> {
        let host = self.load_host().await?;
        let event = self.load_event_type(&host, event_slug).await?;
        let preference = resolve_preference(preference, &event, &host);

        let rules = self.load_rules(&host).await?;
        let mut busy = self.week_busy(&host, date).await?.selected(preference);
        busy.extend(self.load_booked_slots(&host, date).await?);

        let slots = slots::day_slots(&SlotQuery {
            date,
            rules: &rules,
            duration_minutes: event.duration_minutes,
            busy: &busy,
            now: self.clock.now_utc(),
            timezone: &host.timezone,
        })?;

        let result = DayAvailability { slots, stale: false };
        self.store(&CacheStrategy::availability(event_slug, date), &result).await;
        Ok(result)
    }

    async fn compute_month_fresh(
        &self,
        event_slug: &str,
        year: i32,
        month: u32,
        preference: Option<CalendarPreference>,
    ) -> Result<MonthAvailability> {
        let first_day = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| HourglassError::InvalidInput(format!("invalid month: {year}-{month}")))?;
        let next_month = first_day
            .checked_add_months(chrono::Months::new(1))
            .ok_or_else(|| HourglassError::InvalidInput("month out of range".into()))?;

        let host = self.load_host().await?;
        let event = self.load_event_type(&host, event_slug).await?;
        let preference = resolve_preference(preference, &event, &host);
        let rules = self.load_rules(&host).await?;

        let now = self.clock.now_utc();
        let today = self.clock.today_utc();
        let horizon = today + Days::new(BOOKING_HORIZON_DAYS as u64);

        // One booking scan covers the whole month
        self.gate(UsageClass::DbQuery).await?;
        let month_range = TimeSlot::new(
            Utc.from_utc_datetime(&first_day.and_time(NaiveTime::MIN)),
            Utc.from_utc_datetime(&next_month.and_time(NaiveTime::MIN)),
        )?;
        let booked = self.bookings.confirmed_slots_in(&host.id, month_range).await?;

        let mut available_dates = Vec::new();
        let mut date = first_day;
        while date < next_month {
            if date < today || date > horizon {
                date = date + Days::new(1);
                continue;
            }

            // Busy time is cached per ISO week; at most six fetch rounds
            // per month scan
            let mut busy = self.week_busy(&host, date).await?.selected(preference);
            busy.extend_from_slice(&booked);

            let has_slot = slots::day_has_slot(&SlotQuery {
                date,
                rules: &rules,
                duration_minutes: event.duration_minutes,
                busy: &busy,
                now,
                timezone: &host.timezone,
            })?;
            if has_slot {
                available_dates.push(date);
            }

            date = date + Days::new(1);
        }

        let result = MonthAvailability { available_dates, stale: false };
        let month_key = format!("{year:04}-{month:02}");
        self.store(&CacheStrategy::month_availability(event_slug, &month_key), &result).await;
        Ok(result)
    }

    /// Provider busy time for the ISO week containing `date`, fetched once
    /// and cached for any preference to slice.
    async fn week_busy(&self, host: &HostProfile, date: NaiveDate) -> Result<WeekBusy> {
        let week = tz::week_key(date);
        let strategy = CacheStrategy::calendar(&host.id, &week);

        if let Some(cached) = self.cache.get::<WeekBusy>(&strategy).await {
            return Ok(cached);
        }

        let range = week_range(date, &host.timezone)?;
        let this = self.clone();
        let key = strategy.key.clone();
        let host_id = host.id.clone();
        self.week_flights
            .run(&key, move || async move {
                // In-process duplicates are coalesced by the flight above;
                // the user-level sync lock guards against a peer process
                // fetching the same calendar concurrently
                let lock = CacheStrategy::sync_lock(&host_id);
                let fetched = this
                    .cache
                    .get_with_lock(&strategy, &lock, || async {
                        Ok(this.fetch_week_busy(range).await)
                    })
                    .await?;

                match fetched {
                    Some(busy) => {
                        let synced_at = this.clock.millis_since_epoch();
                        this.store(&CacheStrategy::last_sync(&host_id), &synced_at).await;
                        Ok(busy)
                    }
                    // A peer holds the sync lock and its result is not yet
                    // visible; contribute nothing for this request instead
                    // of stalling
                    None => Ok(WeekBusy::default()),
                }
            })
            .await
    }

    /// Query every registered provider for `range`, isolating failures:
    /// an erroring or quota-blocked provider simply contributes nothing.
    async fn fetch_week_busy(&self, range: TimeSlot) -> WeekBusy {
        let mut week = WeekBusy::default();
        for provider in self.providers.iter() {
            if !self.monitor.track(UsageClass::ExternalQuery).await {
                warn!(
                    provider = provider.kind().as_str(),
                    "calendar fetch quota-blocked, contributing nothing"
                );
                continue;
            }
            match provider.busy_times(range).await {
                Ok(busy) => week.push(provider.kind(), busy),
                Err(e) => {
                    warn!(
                        provider = provider.kind().as_str(),
                        error = %e,
                        "provider failed, continuing without its busy time"
                    );
                }
            }
        }
        week
    }

    async fn load_host(&self) -> Result<HostProfile> {
        self.gate(UsageClass::DbQuery).await?;
        self.host
            .host()
            .await?
            .ok_or_else(|| HourglassError::NotFound("host profile not configured".into()))
    }

    async fn load_event_type(&self, host: &HostProfile, slug: &str) -> Result<EventType> {
        let strategy = CacheStrategy::events(&host.id);
        let listing = match self.cache.get::<Vec<EventType>>(&strategy).await {
            Some(listing) => listing,
            None => {
                self.gate(UsageClass::DbQuery).await?;
                let listing = self.event_types.list_for_user(&host.id).await?;
                self.store(&strategy, &listing).await;
                listing
            }
        };

        listing
            .into_iter()
            .find(|event| event.slug == slug && event.is_active)
            .ok_or_else(|| {
                HourglassError::NotFound(format!("event type not found or inactive: {slug}"))
            })
    }

    async fn load_rules(&self, host: &HostProfile) -> Result<Vec<AvailabilityRule>> {
        let strategy = CacheStrategy::rules(&host.id);
        if let Some(rules) = self.cache.get::<Vec<AvailabilityRule>>(&strategy).await {
            return Ok(rules);
        }
        self.gate(UsageClass::DbQuery).await?;
        let rules = self.rules.rules_for_user(&host.id).await?;
        self.store(&strategy, &rules).await;
        Ok(rules)
    }

    async fn load_booked_slots(&self, host: &HostProfile, date: NaiveDate) -> Result<Vec<TimeSlot>> {
        let strategy = CacheStrategy::bookings(date);
        if let Some(slots) = self.cache.get::<Vec<TimeSlot>>(&strategy).await {
            return Ok(slots);
        }
        self.gate(UsageClass::DbQuery).await?;
        let slots = self.bookings.confirmed_slots_on(&host.id, date).await?;
        self.store(&strategy, &slots).await;
        Ok(slots)
    }

    /// Track an operation class, converting a hard-limit refusal into the
    /// retryable quota error.
    async fn gate(&self, class: UsageClass) -> Result<()> {
        if self.monitor.track(class).await {
            Ok(())
        } else {
            Err(HourglassError::QuotaExceeded(format!(
                "daily {} limit reached",
                class.as_str()
            )))
        }
    }

    /// Cache write, skipped (not failed) when the write quota is exhausted.
    async fn store<T: Serialize>(&self, strategy: &CacheStrategy, value: &T) {
        if self.monitor.track(UsageClass::KvWrite).await {
            self.cache.set(strategy, value).await;
        } else {
            warn!(key = %strategy.key, "cache write skipped, kv_write quota exhausted");
        }
    }

    async fn stale_day(&self, strategy: &CacheStrategy) -> Result<DayAvailability> {
        match self.cache.get::<DayAvailability>(strategy).await {
            Some(mut hit) => {
                debug!(key = %strategy.key, "serving stale availability under quota pressure");
                hit.stale = true;
                Ok(hit)
            }
            None => Err(quota_exhausted()),
        }
    }

    async fn stale_month(&self, strategy: &CacheStrategy) -> Result<MonthAvailability> {
        match self.cache.get::<MonthAvailability>(strategy).await {
            Some(mut hit) => {
                debug!(key = %strategy.key, "serving stale month scan under quota pressure");
                hit.stale = true;
                Ok(hit)
            }
            None => Err(quota_exhausted()),
        }
    }
}

fn quota_exhausted() -> HourglassError {
    HourglassError::QuotaExceeded(
        "availability recomputation is quota-blocked and no cached data exists".into(),
    )
}

fn resolve_preference(
    request: Option<CalendarPreference>,
    event: &EventType,
    host: &HostProfile,
) -> CalendarPreference {
    request
        .or(event.calendar_preference)
        .unwrap_or(host.default_calendar_preference)
}

/// UTC range of the local ISO week (Monday 00:00 through next Monday 00:00)
/// containing `date`.
fn week_range(date: NaiveDate, timezone: &str) -> Result<TimeSlot> {
    let monday = date.week(Weekday::Mon).first_day();
    let next_monday = monday + Days::new(7);
    let start = tz::local_to_utc(monday, NaiveTime::MIN, timezone)?;
    let end = tz::local_to_utc(next_monday, NaiveTime::MIN, timezone)?;
    TimeSlot::new(start, end)
}
