//! Application context - dependency injection container
//!
//! Everything the command surface needs is constructed here once, with
//! lifetime scoped to the process; no module-level singletons. Handlers
//! receive the context explicitly.

use std::sync::Arc;

use hourglass_common::cache::{KvStore, MemoryKvStore, TieredCache};
use hourglass_common::testing::{Clock, SystemClock};
use hourglass_core::ports::BusyCalendarProvider;
use hourglass_core::{AvailabilityService, BookingService, UsageMonitor};
use hourglass_domain::Result;
use hourglass_infra::{
    CredentialManager, DbManager, GoogleCalendarProvider, MicrosoftCalendarProvider,
    ProviderCredentials, SqliteBookingRepository, SqliteEventTypeRepository,
    SqliteHostRepository, SqliteRefreshTokenStore, SqliteRuleRepository, SqliteUsageRepository,
    TracingNotifier,
};
use tracing::info;

use crate::config::HourglassConfig;

/// Application context - holds all services and dependencies.
pub struct SchedulerContext {
    pub config: HourglassConfig,
    pub db: Arc<DbManager>,
    pub cache: Arc<TieredCache>,
    pub monitor: Arc<UsageMonitor>,
    pub availability: AvailabilityService,
    pub bookings: BookingService,
}

impl SchedulerContext {
    /// Build the context with the in-process key-value tier and the system
    /// clock.
    pub async fn build(config: HourglassConfig) -> Result<Self> {
        Self::build_with(config, Arc::new(MemoryKvStore::new()), Arc::new(SystemClock)).await
    }

    /// Build the context over an injected key-value store and clock
    /// (shared edge namespace in deployment, mocks in tests).
    pub async fn build_with(
        config: HourglassConfig,
        kv: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let db = Arc::new(DbManager::new(&config.database_path)?);
        let cache = Arc::new(TieredCache::with_clock(kv, clock.clone()));

        let usage = Arc::new(SqliteUsageRepository::new(db.clone()));
        let monitor = Arc::new(UsageMonitor::new(
            cache.clone(),
            usage,
            config.monitor.clone(),
            clock.clone(),
        ));

        let rules = Arc::new(SqliteRuleRepository::new(db.clone()));
        let bookings_repo = Arc::new(SqliteBookingRepository::new(db.clone()));
        let event_types = Arc::new(SqliteEventTypeRepository::new(db.clone()));
        let host_repo = Arc::new(SqliteHostRepository::new(db.clone()));

        let providers = Self::build_providers(&config, &db, &host_repo).await?;
        info!(providers = providers.len(), "scheduler context initialized");

        let availability = AvailabilityService::new(
            cache.clone(),
            monitor.clone(),
            rules,
            bookings_repo.clone(),
            event_types.clone(),
            host_repo.clone(),
            providers.clone(),
            clock,
        );

        let bookings = BookingService::new(
            bookings_repo,
            event_types,
            host_repo,
            providers,
            Arc::new(TracingNotifier),
            cache.clone(),
        );

        Ok(Self { config, db, cache, monitor, availability, bookings })
    }

    /// One provider per configured OAuth client, bound to the host account.
    /// With no host row yet there is nobody to fetch for, so none are
    /// built.
    async fn build_providers(
        config: &HourglassConfig,
        db: &Arc<DbManager>,
        host_repo: &Arc<SqliteHostRepository>,
    ) -> Result<Vec<Arc<dyn BusyCalendarProvider>>> {
        use hourglass_core::ports::HostRepository;

        let Some(host) = host_repo.host().await? else {
            return Ok(Vec::new());
        };

        let token_store = Arc::new(SqliteRefreshTokenStore::new(db.clone()));
        let credentials = Arc::new(CredentialManager::new(
            token_store,
            config
                .providers
                .google
                .as_ref()
                .map(|c| ProviderCredentials::google(c.client_id.clone(), c.client_secret.clone())),
            config
                .providers
                .outlook
                .as_ref()
                .map(|c| ProviderCredentials::outlook(c.client_id.clone(), c.client_secret.clone())),
        ));

        let mut providers: Vec<Arc<dyn BusyCalendarProvider>> = Vec::new();
        if config.providers.google.is_some() {
            providers
                .push(Arc::new(GoogleCalendarProvider::new(credentials.clone(), host.id.clone())));
        }
        if config.providers.outlook.is_some() {
            providers
                .push(Arc::new(MicrosoftCalendarProvider::new(credentials, host.id.clone())));
        }
        Ok(providers)
    }
}
