//! Approval history repository implementation
//!
//! Append-only: there is intentionally no update or delete API.

use sqlx::{PgConnection, PgPool};
use chrono::Utc;
use crate::models::approval::{EventApprovalHistory, NewApprovalRecord};
use crate::utils::errors::CampusHubError;

const HISTORY_COLUMNS: &str = "id, event_id, action, performed_by, performer_name, comments, \
     status_before, status_after, created_at";

#[derive(Debug, Clone)]
pub struct ApprovalHistoryRepository {
    pool: PgPool,
}

impl ApprovalHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append one history record inside the transition's transaction
    pub async fn append(
        conn: &mut PgConnection,
        record: NewApprovalRecord,
    ) -> Result<EventApprovalHistory, CampusHubError> {
        let row = sqlx::query_as::<_, EventApprovalHistory>(
            &format!(
                r#"
                INSERT INTO event_approval_history
                    (event_id, action, performed_by, performer_name, comments,
                     status_before, status_after, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING {HISTORY_COLUMNS}
                "#
            )
        )
        .bind(record.event_id)
        .bind(record.action)
        .bind(record.performed_by)
        .bind(&record.performer_name)
        .bind(&record.comments)
        .bind(record.status_before)
        .bind(record.status_after)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;

        Ok(row)
    }

    /// History for an event, oldest first
    pub async fn list_for_event(&self, event_id: i64) -> Result<Vec<EventApprovalHistory>, CampusHubError> {
        let rows = sqlx::query_as::<_, EventApprovalHistory>(
            &format!(
                "SELECT {HISTORY_COLUMNS} FROM event_approval_history WHERE event_id = $1 ORDER BY created_at ASC, id ASC"
            )
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
