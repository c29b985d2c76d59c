//! Event model and validation rules

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use crate::utils::errors::{CampusHubError, Result};

/// Lifecycle status of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Draft,
    PendingApproval,
    RevisionRequested,
    Published,
    Cancelled,
    Completed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::PendingApproval => "pending_approval",
            EventStatus::RevisionRequested => "revision_requested",
            EventStatus::Published => "published",
            EventStatus::Cancelled => "cancelled",
            EventStatus::Completed => "completed",
        }
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventStatus::Cancelled | EventStatus::Completed)
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub event_at: DateTime<Utc>,
    pub registration_starts_at: DateTime<Utc>,
    pub registration_ends_at: DateTime<Utc>,
    pub location_id: Option<i64>,
    pub max_attendees: Option<i32>,
    pub created_by: i64,
    pub status: EventStatus,
    pub approved_by: Option<i64>,
    pub approval_date: Option<DateTime<Utc>>,
    pub revision_comments: Option<String>,
    pub allowed_categories: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        self.event_at <= now
    }

    pub fn registration_window_open(&self, now: DateTime<Utc>) -> bool {
        self.registration_starts_at <= now && now < self.registration_ends_at
    }

    /// Check a user category against the event's allow-list. Events
    /// without a list accept everyone.
    pub fn category_allowed(&self, category: Option<&str>) -> bool {
        match &self.allowed_categories {
            None => true,
            Some(allowed) => match category {
                Some(cat) => allowed.iter().any(|c| c == cat),
                None => false,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub event_at: DateTime<Utc>,
    pub registration_starts_at: DateTime<Utc>,
    pub registration_ends_at: DateTime<Utc>,
    pub location_id: Option<i64>,
    pub max_attendees: Option<i32>,
    pub allowed_categories: Option<Vec<String>>,
    /// Staff roles may create the event directly in `published`.
    pub publish_immediately: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_at: Option<DateTime<Utc>>,
    pub registration_starts_at: Option<DateTime<Utc>>,
    pub registration_ends_at: Option<DateTime<Utc>>,
    pub location_id: Option<i64>,
    pub max_attendees: Option<i32>,
    pub allowed_categories: Option<Vec<String>>,
}

/// Validate the schedule invariant: registration opens before it closes,
/// and closes no later than the event itself.
pub fn validate_schedule(
    event_at: DateTime<Utc>,
    registration_starts_at: DateTime<Utc>,
    registration_ends_at: DateTime<Utc>,
) -> Result<()> {
    if registration_starts_at >= registration_ends_at {
        return Err(CampusHubError::Validation(
            "Registration must start before it ends".to_string(),
        ));
    }
    if registration_ends_at > event_at {
        return Err(CampusHubError::Validation(
            "Registration must end no later than the event starts".to_string(),
        ));
    }
    Ok(())
}

impl CreateEventRequest {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(CampusHubError::Validation("Event title is required".to_string()));
        }
        if self.title.len() > 200 {
            return Err(CampusHubError::Validation(
                "Event title cannot exceed 200 characters".to_string(),
            ));
        }
        if let Some(max) = self.max_attendees {
            if max <= 0 {
                return Err(CampusHubError::Validation(
                    "Max attendees must be greater than 0".to_string(),
                ));
            }
        }
        if let Some(categories) = &self.allowed_categories {
            if categories.is_empty() || categories.iter().any(|c| c.trim().is_empty()) {
                return Err(CampusHubError::Validation(
                    "Category restrictions cannot be empty".to_string(),
                ));
            }
        }
        validate_schedule(
            self.event_at,
            self.registration_starts_at,
            self.registration_ends_at,
        )
    }
}
