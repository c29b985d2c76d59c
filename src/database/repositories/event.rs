//! Event repository implementation
//!
//! Plain reads go through the pool; the lifecycle and allocator services
//! pass a transaction connection into the locking/mutating functions so
//! status decisions serialize per event.

use sqlx::{PgConnection, PgPool};
use chrono::{DateTime, Utc};
use crate::models::event::{CreateEventRequest, Event, EventStatus, UpdateEventRequest};
use crate::utils::errors::CampusHubError;

const EVENT_COLUMNS: &str = "id, title, description, event_at, registration_starts_at, \
     registration_ends_at, location_id, max_attendees, created_by, status, approved_by, \
     approval_date, revision_comments, allowed_categories, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new event
    pub async fn create(
        &self,
        request: &CreateEventRequest,
        created_by: i64,
        status: EventStatus,
    ) -> Result<Event, CampusHubError> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (title, description, event_at, registration_starts_at,
                registration_ends_at, location_id, max_attendees, created_by, status,
                allowed_categories, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            RETURNING id, title, description, event_at, registration_starts_at,
                registration_ends_at, location_id, max_attendees, created_by, status,
                approved_by, approval_date, revision_comments, allowed_categories,
                created_at, updated_at
            "#
        )
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.event_at)
        .bind(request.registration_starts_at)
        .bind(request.registration_ends_at)
        .bind(request.location_id)
        .bind(request.max_attendees)
        .bind(created_by)
        .bind(status)
        .bind(&request.allowed_categories)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    /// Find event by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Event>, CampusHubError> {
        let event = sqlx::query_as::<_, Event>(
            &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1")
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    /// Fetch an event row inside a transaction, taking a row lock so
    /// concurrent status/capacity decisions on the same event serialize.
    pub async fn lock_by_id(
        conn: &mut PgConnection,
        id: i64,
    ) -> Result<Option<Event>, CampusHubError> {
        let event = sqlx::query_as::<_, Event>(
            &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE")
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(event)
    }

    /// Set the event status, clearing nothing else
    pub async fn set_status(
        conn: &mut PgConnection,
        id: i64,
        status: EventStatus,
    ) -> Result<Event, CampusHubError> {
        let event = sqlx::query_as::<_, Event>(
            &format!(
                "UPDATE events SET status = $2, updated_at = $3 WHERE id = $1 RETURNING {EVENT_COLUMNS}"
            )
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;

        Ok(event)
    }

    /// Publish an approved event, recording the approver and clearing any
    /// previous revision comments
    pub async fn mark_approved(
        conn: &mut PgConnection,
        id: i64,
        approved_by: i64,
        approval_date: DateTime<Utc>,
    ) -> Result<Event, CampusHubError> {
        let event = sqlx::query_as::<_, Event>(
            &format!(
                r#"
                UPDATE events
                SET status = 'published',
                    approved_by = $2,
                    approval_date = $3,
                    revision_comments = NULL,
                    updated_at = $4
                WHERE id = $1
                RETURNING {EVENT_COLUMNS}
                "#
            )
        )
        .bind(id)
        .bind(approved_by)
        .bind(approval_date)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;

        Ok(event)
    }

    /// Send an event back to its creator with reviewer comments
    pub async fn mark_revision_requested(
        conn: &mut PgConnection,
        id: i64,
        comments: &str,
    ) -> Result<Event, CampusHubError> {
        let event = sqlx::query_as::<_, Event>(
            &format!(
                r#"
                UPDATE events
                SET status = 'revision_requested',
                    revision_comments = $2,
                    updated_at = $3
                WHERE id = $1
                RETURNING {EVENT_COLUMNS}
                "#
            )
        )
        .bind(id)
        .bind(comments)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;

        Ok(event)
    }

    /// Update event fields
    pub async fn update(&self, id: i64, request: UpdateEventRequest) -> Result<Event, CampusHubError> {
        let event = sqlx::query_as::<_, Event>(
            &format!(
                r#"
                UPDATE events
                SET title = COALESCE($2, title),
                    description = COALESCE($3, description),
                    event_at = COALESCE($4, event_at),
                    registration_starts_at = COALESCE($5, registration_starts_at),
                    registration_ends_at = COALESCE($6, registration_ends_at),
                    location_id = COALESCE($7, location_id),
                    max_attendees = COALESCE($8, max_attendees),
                    allowed_categories = COALESCE($9, allowed_categories),
                    updated_at = $10
                WHERE id = $1
                RETURNING {EVENT_COLUMNS}
                "#
            )
        )
        .bind(id)
        .bind(request.title)
        .bind(request.description)
        .bind(request.event_at)
        .bind(request.registration_starts_at)
        .bind(request.registration_ends_at)
        .bind(request.location_id)
        .bind(request.max_attendees)
        .bind(request.allowed_categories)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    /// Delete event; registrations, history and reminder logs cascade
    pub async fn delete(&self, id: i64) -> Result<(), CampusHubError> {
        sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Get upcoming published events
    pub async fn list_upcoming(&self, limit: Option<i64>) -> Result<Vec<Event>, CampusHubError> {
        let limit = limit.unwrap_or(50);
        let events = sqlx::query_as::<_, Event>(
            &format!(
                "SELECT {EVENT_COLUMNS} FROM events WHERE event_at > NOW() AND status = 'published' ORDER BY event_at ASC LIMIT $1"
            )
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Get events in a given status
    pub async fn list_by_status(&self, status: EventStatus) -> Result<Vec<Event>, CampusHubError> {
        let events = sqlx::query_as::<_, Event>(
            &format!("SELECT {EVENT_COLUMNS} FROM events WHERE status = $1 ORDER BY event_at ASC")
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Get events created by a user
    pub async fn list_created_by(&self, user_id: i64) -> Result<Vec<Event>, CampusHubError> {
        let events = sqlx::query_as::<_, Event>(
            &format!("SELECT {EVENT_COLUMNS} FROM events WHERE created_by = $1 ORDER BY event_at ASC")
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Published events whose start time falls inside a scan window
    pub async fn published_starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Event>, CampusHubError> {
        let events = sqlx::query_as::<_, Event>(
            &format!(
                "SELECT {EVENT_COLUMNS} FROM events WHERE status = 'published' AND event_at >= $1 AND event_at <= $2 ORDER BY event_at ASC"
            )
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Published events whose registration deadline falls inside a scan window
    pub async fn published_registration_ending_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Event>, CampusHubError> {
        let events = sqlx::query_as::<_, Event>(
            &format!(
                "SELECT {EVENT_COLUMNS} FROM events WHERE status = 'published' AND registration_ends_at >= $1 AND registration_ends_at <= $2 ORDER BY registration_ends_at ASC"
            )
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Count total events
    pub async fn count(&self) -> Result<i64, CampusHubError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
