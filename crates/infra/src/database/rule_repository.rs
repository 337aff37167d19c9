//! Sqlite implementation of RuleRepository

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveTime;
use hourglass_core::ports::RuleRepository;
use hourglass_domain::{AvailabilityRule, HourglassError, Result};

use super::manager::DbManager;
use crate::errors::InfraError;

/// Rule times are stored as `HH:MM` wall-clock strings.
fn parse_rule_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|e| HourglassError::Database(format!("invalid rule time {value}: {e}")))
}

pub struct SqliteRuleRepository {
    db: Arc<DbManager>,
}

impl SqliteRuleRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RuleRepository for SqliteRuleRepository {
    async fn rules_for_user(&self, user_id: &str) -> Result<Vec<AvailabilityRule>> {
        let db = self.db.clone();
        let user_id = user_id.to_owned();
        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT day_of_week, start_time, end_time
                     FROM availability_rules
                     WHERE user_id = ?1
                     ORDER BY day_of_week, start_time",
                )
                .map_err(InfraError::from)?;

            let rows = stmt
                .query_map([&user_id], |row| {
                    Ok((row.get::<_, u8>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
                })
                .map_err(InfraError::from)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(InfraError::from)?;

            rows.into_iter()
                .map(|(day_of_week, start, end)| {
                    Ok(AvailabilityRule {
                        day_of_week,
                        start_time: parse_rule_time(&start)?,
                        end_time: parse_rule_time(&end)?,
                    })
                })
                .collect()
        })
        .await
        .map_err(|e| HourglassError::Internal(e.to_string()))?
    }

    async fn replace_rules(&self, user_id: &str, rules: &[AvailabilityRule]) -> Result<()> {
        let db = self.db.clone();
        let user_id = user_id.to_owned();
        let rules = rules.to_vec();
        tokio::task::spawn_blocking(move || {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(InfraError::from)?;

            // Wholesale replace: delete everything, insert the new set
            tx.execute("DELETE FROM availability_rules WHERE user_id = ?1", [&user_id])
                .map_err(InfraError::from)?;
            for rule in &rules {
                tx.execute(
                    "INSERT INTO availability_rules (user_id, day_of_week, start_time, end_time)
                     VALUES (?1, ?2, ?3, ?4)",
                    (
                        &user_id,
                        rule.day_of_week,
                        rule.start_time.format("%H:%M").to_string(),
                        rule.end_time.format("%H:%M").to_string(),
                    ),
                )
                .map_err(InfraError::from)?;
            }

            tx.commit().map_err(InfraError::from)?;
            Ok(())
        })
        .await
        .map_err(|e| HourglassError::Internal(e.to_string()))?
    }
}
