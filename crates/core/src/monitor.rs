//! Usage governor: daily per-class quotas with graceful degradation
//!
//! Every tracked operation increments a day-scoped counter in the cache
//! tier. Past the warning threshold the monitor logs; at the hard limit it
//! answers `false` and the caller must serve cached/stale data instead of
//! performing the expensive operation. Counters expire with their 24h TTL,
//! which is what rolls the quota over at the day boundary.

use std::sync::Arc;

use hourglass_domain::constants::{
    DEFAULT_DB_QUERY_DAILY_LIMIT, DEFAULT_EXTERNAL_QUERY_DAILY_LIMIT, DEFAULT_KV_READ_DAILY_LIMIT,
    DEFAULT_KV_WRITE_DAILY_LIMIT, USAGE_SAMPLE_EVERY, USAGE_WARNING_RATIO,
};
use hourglass_domain::{UsageClass, UsageCounter};
use hourglass_common::cache::{CacheStrategy, TieredCache};
use hourglass_common::testing::Clock;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::ports::UsageRepository;

/// Hard daily limits per operation class.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyLimits {
    pub kv_read: u64,
    pub kv_write: u64,
    pub db_query: u64,
    pub external_query: u64,
}

impl Default for DailyLimits {
    fn default() -> Self {
        Self {
            kv_read: DEFAULT_KV_READ_DAILY_LIMIT,
            kv_write: DEFAULT_KV_WRITE_DAILY_LIMIT,
            db_query: DEFAULT_DB_QUERY_DAILY_LIMIT,
            external_query: DEFAULT_EXTERNAL_QUERY_DAILY_LIMIT,
        }
    }
}

impl DailyLimits {
    pub fn limit(&self, class: UsageClass) -> u64 {
        match class {
            UsageClass::KvRead => self.kv_read,
            UsageClass::KvWrite => self.kv_write,
            UsageClass::DbQuery => self.db_query,
            UsageClass::ExternalQuery => self.external_query,
        }
    }
}

/// Governor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub daily_limits: DailyLimits,
    /// Fraction of the hard limit at which warnings start.
    pub warning_ratio: f64,
    /// Persist a durable snapshot every Nth increment. Sampled telemetry,
    /// not an audit log.
    pub sample_every: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            daily_limits: DailyLimits::default(),
            warning_ratio: USAGE_WARNING_RATIO,
            sample_every: USAGE_SAMPLE_EVERY,
        }
    }
}

/// Usage for one class on the current day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassUsage {
    pub class: UsageClass,
    pub count: u64,
    pub limit: u64,
    pub percent: u8,
}

/// Snapshot of today's usage across all classes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageStats {
    pub classes: Vec<ClassUsage>,
}

/// Daily usage governor over the cache's counter primitive.
///
/// The counter increment is read-modify-write and therefore approximate
/// under concurrency; quotas here are protective rails, not billing.
pub struct UsageMonitor {
    cache: Arc<TieredCache>,
    snapshots: Arc<dyn UsageRepository>,
    config: MonitorConfig,
    clock: Arc<dyn Clock>,
}

impl UsageMonitor {
    pub fn new(
        cache: Arc<TieredCache>,
        snapshots: Arc<dyn UsageRepository>,
        config: MonitorConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { cache, snapshots, config, clock }
    }

    /// Record one operation of `class`.
    ///
    /// Returns `false` when the class's hard daily limit has been reached -
    /// the caller must not perform the expensive operation and should serve
    /// cached/stale data or fail gracefully instead.
    pub async fn track(&self, class: UsageClass) -> bool {
        let today = self.clock.today_utc();
        let strategy = CacheStrategy::api_usage(class, today);
        let count = self.cache.increment(&strategy).await;

        let limit = self.config.daily_limits.limit(class);
        if count >= limit {
            error!(class = class.as_str(), count, limit, "daily usage limit exceeded");
            return false;
        }

        let warning_at = (limit as f64 * self.config.warning_ratio) as u64;
        if count >= warning_at {
            warn!(
                class = class.as_str(),
                count,
                limit,
                percent = count * 100 / limit.max(1),
                "daily usage approaching limit"
            );
        }

        if self.config.sample_every > 0 && count % self.config.sample_every == 0 {
            let snapshot = UsageCounter { class, date: today, count };
            if let Err(e) = self.snapshots.upsert_snapshot(&snapshot).await {
                warn!(class = class.as_str(), error = %e, "usage snapshot write failed");
            }
        }

        true
    }

    /// Today's counts, limits, and utilization percentages.
    pub async fn usage_stats(&self) -> UsageStats {
        let today = self.clock.today_utc();
        let mut classes = Vec::with_capacity(UsageClass::ALL.len());
        for class in UsageClass::ALL {
            let strategy = CacheStrategy::api_usage(class, today);
            let count = self.cache.counter_value(&strategy).await;
            let limit = self.config.daily_limits.limit(class);
            let percent = if limit == 0 {
                100
            } else {
                (count.saturating_mul(100) / limit).min(u64::from(u8::MAX)) as u8
            };
            classes.push(ClassUsage { class, count, limit, percent });
        }
        UsageStats { classes }
    }
}
