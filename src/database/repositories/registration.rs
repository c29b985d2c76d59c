//! Registration repository implementation
//!
//! Capacity-relevant queries take a transaction connection; the caller is
//! expected to hold the event row lock before counting or inserting.

use sqlx::{PgConnection, PgPool};
use chrono::{DateTime, Utc};
use crate::models::registration::{EventRegistration, RegistrationCounts, RegistrationStatus};
use crate::utils::errors::CampusHubError;

const REGISTRATION_COLUMNS: &str =
    "id, event_id, user_id, registered_at, status, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct RegistrationRepository {
    pool: PgPool,
}

impl RegistrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the registration row for an (event, user) pair
    pub async fn find_by_event_and_user(
        &self,
        event_id: i64,
        user_id: i64,
    ) -> Result<Option<EventRegistration>, CampusHubError> {
        let registration = sqlx::query_as::<_, EventRegistration>(
            &format!(
                "SELECT {REGISTRATION_COLUMNS} FROM event_registrations WHERE event_id = $1 AND user_id = $2"
            )
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(registration)
    }

    /// Transactional variant of [`find_by_event_and_user`]
    pub async fn find_by_event_and_user_tx(
        conn: &mut PgConnection,
        event_id: i64,
        user_id: i64,
    ) -> Result<Option<EventRegistration>, CampusHubError> {
        let registration = sqlx::query_as::<_, EventRegistration>(
            &format!(
                "SELECT {REGISTRATION_COLUMNS} FROM event_registrations WHERE event_id = $1 AND user_id = $2"
            )
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

        Ok(registration)
    }

    /// Insert a fresh registration row
    pub async fn insert(
        conn: &mut PgConnection,
        event_id: i64,
        user_id: i64,
        status: RegistrationStatus,
        registered_at: DateTime<Utc>,
    ) -> Result<EventRegistration, CampusHubError> {
        let registration = sqlx::query_as::<_, EventRegistration>(
            &format!(
                r#"
                INSERT INTO event_registrations (event_id, user_id, registered_at, status, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $5)
                RETURNING {REGISTRATION_COLUMNS}
                "#
            )
        )
        .bind(event_id)
        .bind(user_id)
        .bind(registered_at)
        .bind(status)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;

        Ok(registration)
    }

    /// Set the status of an existing row
    pub async fn set_status(
        conn: &mut PgConnection,
        id: i64,
        status: RegistrationStatus,
    ) -> Result<EventRegistration, CampusHubError> {
        let registration = sqlx::query_as::<_, EventRegistration>(
            &format!(
                r#"
                UPDATE event_registrations
                SET status = $2, updated_at = $3
                WHERE id = $1
                RETURNING {REGISTRATION_COLUMNS}
                "#
            )
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;

        Ok(registration)
    }

    /// Reactivate a cancelled row with a new allocation decision. The
    /// registration timestamp resets so the row queues behind current
    /// waitlist entries.
    pub async fn reactivate(
        conn: &mut PgConnection,
        id: i64,
        status: RegistrationStatus,
        registered_at: DateTime<Utc>,
    ) -> Result<EventRegistration, CampusHubError> {
        let registration = sqlx::query_as::<_, EventRegistration>(
            &format!(
                r#"
                UPDATE event_registrations
                SET status = $2, registered_at = $3, updated_at = $4
                WHERE id = $1
                RETURNING {REGISTRATION_COLUMNS}
                "#
            )
        )
        .bind(id)
        .bind(status)
        .bind(registered_at)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;

        Ok(registration)
    }

    /// Count rows in a given status for an event, inside a transaction
    pub async fn count_by_status_tx(
        conn: &mut PgConnection,
        event_id: i64,
        status: RegistrationStatus,
    ) -> Result<i64, CampusHubError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM event_registrations WHERE event_id = $1 AND status = $2"
        )
        .bind(event_id)
        .bind(status)
        .fetch_one(conn)
        .await?;

        Ok(count.0)
    }

    /// The waitlisted registration next in line for a freed seat: FIFO by
    /// registration timestamp, id as the tie-break.
    pub async fn earliest_waitlisted(
        conn: &mut PgConnection,
        event_id: i64,
    ) -> Result<Option<EventRegistration>, CampusHubError> {
        let registration = sqlx::query_as::<_, EventRegistration>(
            &format!(
                r#"
                SELECT {REGISTRATION_COLUMNS}
                FROM event_registrations
                WHERE event_id = $1 AND status = 'waitlisted'
                ORDER BY registered_at ASC, id ASC
                LIMIT 1
                "#
            )
        )
        .bind(event_id)
        .fetch_optional(conn)
        .await?;

        Ok(registration)
    }

    /// Live counts grouped by status
    pub async fn counts_for_event(&self, event_id: i64) -> Result<RegistrationCounts, CampusHubError> {
        let rows: Vec<(RegistrationStatus, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM event_registrations WHERE event_id = $1 GROUP BY status"
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = RegistrationCounts::default();
        for (status, count) in rows {
            match status {
                RegistrationStatus::Registered => counts.registered = count,
                RegistrationStatus::Waitlisted => counts.waitlisted = count,
                RegistrationStatus::Cancelled => counts.cancelled = count,
            }
        }

        Ok(counts)
    }

    /// All registration rows for an event in registration order
    pub async fn list_for_event(&self, event_id: i64) -> Result<Vec<EventRegistration>, CampusHubError> {
        let registrations = sqlx::query_as::<_, EventRegistration>(
            &format!(
                "SELECT {REGISTRATION_COLUMNS} FROM event_registrations WHERE event_id = $1 ORDER BY registered_at ASC, id ASC"
            )
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(registrations)
    }

    /// All active registrations held by a user
    pub async fn list_active_for_user(&self, user_id: i64) -> Result<Vec<EventRegistration>, CampusHubError> {
        let registrations = sqlx::query_as::<_, EventRegistration>(
            &format!(
                "SELECT {REGISTRATION_COLUMNS} FROM event_registrations WHERE user_id = $1 AND status IN ('registered', 'waitlisted') ORDER BY registered_at ASC"
            )
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(registrations)
    }
}
