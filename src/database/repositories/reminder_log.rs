//! Reminder log repository implementation

use sqlx::PgPool;
use chrono::{DateTime, Utc};
use crate::models::reminder::{ReminderLog, ReminderType};
use crate::utils::errors::CampusHubError;

#[derive(Debug, Clone)]
pub struct ReminderLogRepository {
    pool: PgPool,
}

impl ReminderLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Check whether the batch reminder for (event, type) was already sent
    pub async fn batch_exists(
        &self,
        event_id: i64,
        reminder_type: ReminderType,
    ) -> Result<bool, CampusHubError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM reminder_logs WHERE event_id = $1 AND reminder_type = $2 AND user_id IS NULL"
        )
        .bind(event_id)
        .bind(reminder_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0 > 0)
    }

    /// Record a batch send. Returns false when another tick already wrote
    /// the row; the partial unique index makes this race-safe.
    pub async fn record_batch(
        &self,
        event_id: i64,
        reminder_type: ReminderType,
        sent_at: DateTime<Utc>,
    ) -> Result<bool, CampusHubError> {
        let result = sqlx::query(
            r#"
            INSERT INTO reminder_logs (event_id, user_id, reminder_type, sent_at, created_at)
            VALUES ($1, NULL, $2, $3, $4)
            ON CONFLICT (event_id, reminder_type) WHERE user_id IS NULL DO NOTHING
            "#
        )
        .bind(event_id)
        .bind(reminder_type)
        .bind(sent_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Reminder rows for an event, oldest first
    pub async fn list_for_event(&self, event_id: i64) -> Result<Vec<ReminderLog>, CampusHubError> {
        let rows = sqlx::query_as::<_, ReminderLog>(
            "SELECT id, event_id, user_id, reminder_type, sent_at, created_at FROM reminder_logs WHERE event_id = $1 ORDER BY created_at ASC, id ASC"
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
