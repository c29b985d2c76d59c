//! Event service implementation
//!
//! CRUD and validation for events. Status changes beyond creation belong
//! to the lifecycle service; this service never mutates a status after
//! the initial insert.

use tracing::{debug, info};
use crate::database::DatabaseService;
use crate::models::event::validate_schedule;
use crate::models::{Actor, CreateEventRequest, Event, EventStatus, UpdateEventRequest};
use crate::utils::clock::SharedClock;
use crate::utils::errors::{CampusHubError, Result};

#[derive(Clone)]
pub struct EventService {
    db: DatabaseService,
    clock: SharedClock,
}

impl EventService {
    pub fn new(db: DatabaseService, clock: SharedClock) -> Self {
        Self { db, clock }
    }

    /// Create an event in draft, or published directly for staff callers
    /// requesting it.
    pub async fn create_event(&self, request: CreateEventRequest, actor: &Actor) -> Result<Event> {
        request.validate()?;

        if let Some(location_id) = request.location_id {
            let location = self
                .db
                .locations
                .find_by_id(location_id)
                .await?
                .ok_or(CampusHubError::LocationNotFound { location_id })?;
            if !location.active {
                return Err(CampusHubError::Validation(
                    "Location is not available".to_string(),
                ));
            }
        }

        let status = if request.publish_immediately {
            if !actor.role.is_staff() {
                return Err(CampusHubError::PermissionDenied(
                    "Publishing without review requires a staff role".to_string(),
                ));
            }
            if request.event_at <= self.clock.now() {
                return Err(CampusHubError::EventInPast);
            }
            EventStatus::Published
        } else {
            EventStatus::Draft
        };

        let event = self.db.events.create(&request, actor.user_id, status).await?;
        info!(
            event_id = event.id,
            user_id = actor.user_id,
            status = %event.status,
            "Event created"
        );

        Ok(event)
    }

    /// Get event by ID
    pub async fn get_event(&self, event_id: i64) -> Result<Event> {
        self.db
            .events
            .find_by_id(event_id)
            .await?
            .ok_or(CampusHubError::EventNotFound { event_id })
    }

    /// Update event fields. Creator or staff; terminal events are frozen.
    pub async fn update_event(
        &self,
        event_id: i64,
        request: UpdateEventRequest,
        actor: &Actor,
    ) -> Result<Event> {
        let event = self.get_event(event_id).await?;

        if actor.user_id != event.created_by && !actor.role.is_staff() {
            return Err(CampusHubError::PermissionDenied(
                "Only the creator or staff can update an event".to_string(),
            ));
        }
        if event.status.is_terminal() {
            return Err(CampusHubError::Validation(
                "Cancelled or completed events cannot be updated".to_string(),
            ));
        }

        if let Some(title) = &request.title {
            if title.trim().is_empty() {
                return Err(CampusHubError::Validation("Event title is required".to_string()));
            }
        }
        if let Some(max) = request.max_attendees {
            if max <= 0 {
                return Err(CampusHubError::Validation(
                    "Max attendees must be greater than 0".to_string(),
                ));
            }
        }

        // The schedule invariant must hold over the merged fields.
        let event_at = request.event_at.unwrap_or(event.event_at);
        let starts = request
            .registration_starts_at
            .unwrap_or(event.registration_starts_at);
        let ends = request
            .registration_ends_at
            .unwrap_or(event.registration_ends_at);
        validate_schedule(event_at, starts, ends)?;

        if let Some(location_id) = request.location_id {
            let location = self
                .db
                .locations
                .find_by_id(location_id)
                .await?
                .ok_or(CampusHubError::LocationNotFound { location_id })?;
            if !location.active {
                return Err(CampusHubError::Validation(
                    "Location is not available".to_string(),
                ));
            }
        }

        let updated = self.db.events.update(event_id, request).await?;
        debug!(event_id = event_id, user_id = actor.user_id, "Event updated");

        Ok(updated)
    }

    /// Delete event; registrations, history and reminder logs cascade.
    pub async fn delete_event(&self, event_id: i64, actor: &Actor) -> Result<()> {
        let event = self.get_event(event_id).await?;

        if actor.user_id != event.created_by && !actor.role.is_staff() {
            return Err(CampusHubError::PermissionDenied(
                "Only the creator or staff can delete an event".to_string(),
            ));
        }

        self.db.events.delete(event_id).await?;
        info!(event_id = event_id, user_id = actor.user_id, "Event deleted");

        Ok(())
    }

    /// Upcoming published events
    pub async fn list_upcoming(&self, limit: Option<i64>) -> Result<Vec<Event>> {
        self.db.events.list_upcoming(limit).await
    }

    /// Events awaiting review, for approver dashboards
    pub async fn list_pending_approval(&self) -> Result<Vec<Event>> {
        self.db.events.list_by_status(EventStatus::PendingApproval).await
    }

    /// Events created by a user
    pub async fn list_created_by(&self, user_id: i64) -> Result<Vec<Event>> {
        self.db.events.list_created_by(user_id).await
    }
}
