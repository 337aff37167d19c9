//! Usage stats command

use hourglass_core::UsageStats;

use crate::context::SchedulerContext;

/// Today's per-class usage counts against the configured limits.
pub async fn get_usage_stats(ctx: &SchedulerContext) -> UsageStats {
    ctx.monitor.usage_stats().await
}
