//! In-memory calendar provider fake.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use hourglass_core::ports::{BusyCalendarProvider, CalendarEventRequest};
use hourglass_domain::{HourglassError, ProviderKind, Result, TimeSlot};
use parking_lot::Mutex;

/// Provider fake serving a fixed busy set, with call counting and failure
/// injection.
pub struct StaticBusyProvider {
    kind: ProviderKind,
    busy: Mutex<Vec<TimeSlot>>,
    pub busy_calls: AtomicU32,
    pub created_events: Mutex<Vec<CalendarEventRequest>>,
    pub deleted_events: Mutex<Vec<String>>,
    pub updated_events: Mutex<Vec<(String, TimeSlot)>>,
    fail: AtomicBool,
}

impl StaticBusyProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            busy: Mutex::new(Vec::new()),
            busy_calls: AtomicU32::new(0),
            created_events: Mutex::new(Vec::new()),
            deleted_events: Mutex::new(Vec::new()),
            updated_events: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn google() -> Self {
        Self::new(ProviderKind::Google)
    }

    pub fn outlook() -> Self {
        Self::new(ProviderKind::Outlook)
    }

    pub fn set_busy(&self, busy: Vec<TimeSlot>) {
        *self.busy.lock() = busy;
    }

    pub fn fail_requests(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn busy_call_count(&self) -> u32 {
        self.busy_calls.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(HourglassError::Upstream(format!(
                "{} is unreachable",
                self.kind.as_str()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl BusyCalendarProvider for StaticBusyProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn busy_times(&self, range: TimeSlot) -> Result<Vec<TimeSlot>> {
        self.busy_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(self.busy.lock().iter().filter(|b| b.overlaps(&range)).copied().collect())
    }

    async fn create_event(&self, request: &CalendarEventRequest) -> Result<String> {
        self.check_failure()?;
        let mut created = self.created_events.lock();
        created.push(request.clone());
        Ok(format!("evt-{}", created.len()))
    }

    async fn update_event(&self, event_ref: &str, slot: TimeSlot) -> Result<()> {
        self.check_failure()?;
        self.updated_events.lock().push((event_ref.to_string(), slot));
        Ok(())
    }

    async fn delete_event(&self, event_ref: &str) -> Result<()> {
        self.check_failure()?;
        self.deleted_events.lock().push(event_ref.to_string());
        Ok(())
    }
}
