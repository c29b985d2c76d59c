//! Event approval state machine
//!
//! Role-gated status transitions for events. Every transition validates
//! the current status, then the caller's role/ownership, then any date
//! precondition, and persists the new status together with its side
//! fields in one transaction. The three approval-workflow actions append
//! one append-only history record each.

use std::collections::HashMap;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{info, warn};
use crate::database::{ApprovalHistoryRepository, DatabaseService, EventRepository};
use crate::models::{
    Actor, ApprovalAction, Event, EventApprovalHistory, EventStatus, NewApprovalRecord, UserRole,
};
use crate::services::notification::{NotificationService, TemplateKind};
use crate::utils::clock::SharedClock;
use crate::utils::errors::{CampusHubError, Result};

/// Pure transition legality checks, separated from persistence so the
/// rules are testable against plain event values.
pub mod transitions {
    use super::*;

    fn invalid(from: EventStatus, to: EventStatus) -> CampusHubError {
        CampusHubError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// draft/revision_requested -> pending_approval, by the creator
    /// holding the regular user role. Staff publish directly instead.
    pub fn check_submit(event: &Event, actor: &Actor) -> Result<()> {
        if !matches!(
            event.status,
            EventStatus::Draft | EventStatus::RevisionRequested
        ) {
            return Err(invalid(event.status, EventStatus::PendingApproval));
        }
        if actor.user_id != event.created_by {
            return Err(CampusHubError::PermissionDenied(
                "Only the event creator can submit it for approval".to_string(),
            ));
        }
        if actor.role != UserRole::User {
            return Err(CampusHubError::PermissionDenied(
                "Only regular users submit events for approval".to_string(),
            ));
        }
        Ok(())
    }

    /// pending_approval -> published, by an approver-capable role, for a
    /// future event.
    pub fn check_approve(event: &Event, actor: &Actor, now: DateTime<Utc>) -> Result<()> {
        if event.status != EventStatus::PendingApproval {
            return Err(invalid(event.status, EventStatus::Published));
        }
        if !actor.role.can_approve() {
            return Err(CampusHubError::PermissionDenied(
                "Approving events requires an approver role".to_string(),
            ));
        }
        if event.is_past(now) {
            return Err(CampusHubError::EventInPast);
        }
        Ok(())
    }

    /// pending_approval -> revision_requested, with mandatory comments.
    pub fn check_request_revision(event: &Event, actor: &Actor, comments: &str) -> Result<()> {
        if event.status != EventStatus::PendingApproval {
            return Err(invalid(event.status, EventStatus::RevisionRequested));
        }
        if !actor.role.can_approve() {
            return Err(CampusHubError::PermissionDenied(
                "Requesting revisions requires an approver role".to_string(),
            ));
        }
        if comments.trim().is_empty() {
            return Err(CampusHubError::Validation(
                "Revision comments are required".to_string(),
            ));
        }
        Ok(())
    }

    /// draft -> published without review, staff only.
    pub fn check_publish_direct(event: &Event, actor: &Actor, now: DateTime<Utc>) -> Result<()> {
        if event.status != EventStatus::Draft {
            return Err(invalid(event.status, EventStatus::Published));
        }
        if !actor.role.is_staff() {
            return Err(CampusHubError::PermissionDenied(
                "Publishing without review requires a staff role".to_string(),
            ));
        }
        if event.is_past(now) {
            return Err(CampusHubError::EventInPast);
        }
        Ok(())
    }

    /// any non-terminal -> cancelled, by creator or staff.
    pub fn check_cancel(event: &Event, actor: &Actor) -> Result<()> {
        if event.status.is_terminal() {
            return Err(invalid(event.status, EventStatus::Cancelled));
        }
        if actor.user_id != event.created_by && !actor.role.is_staff() {
            return Err(CampusHubError::PermissionDenied(
                "Only the creator or staff can cancel an event".to_string(),
            ));
        }
        Ok(())
    }

    /// published -> completed, staff only, once the event has taken place.
    pub fn check_complete(event: &Event, actor: &Actor, now: DateTime<Utc>) -> Result<()> {
        if event.status != EventStatus::Published {
            return Err(invalid(event.status, EventStatus::Completed));
        }
        if !actor.role.is_staff() {
            return Err(CampusHubError::PermissionDenied(
                "Completing events requires a staff role".to_string(),
            ));
        }
        if !event.is_past(now) {
            return Err(CampusHubError::Validation(
                "Event has not taken place yet".to_string(),
            ));
        }
        Ok(())
    }
}

/// Service driving the approval workflow.
#[derive(Clone)]
pub struct LifecycleService {
    pool: PgPool,
    db: DatabaseService,
    notifications: Arc<NotificationService>,
    clock: SharedClock,
}

impl LifecycleService {
    pub fn new(
        pool: PgPool,
        db: DatabaseService,
        notifications: Arc<NotificationService>,
        clock: SharedClock,
    ) -> Self {
        Self {
            pool,
            db,
            notifications,
            clock,
        }
    }

    /// Submit a draft (or revised) event for approval.
    pub async fn submit_for_approval(&self, event_id: i64, actor: &Actor) -> Result<Event> {
        let performer_name = self.resolve_performer_name(actor.user_id).await?;

        let mut tx = self.pool.begin().await?;
        let event = EventRepository::lock_by_id(&mut tx, event_id)
            .await?
            .ok_or(CampusHubError::EventNotFound { event_id })?;
        transitions::check_submit(&event, actor)?;

        let updated = EventRepository::set_status(&mut tx, event_id, EventStatus::PendingApproval).await?;
        ApprovalHistoryRepository::append(
            &mut tx,
            NewApprovalRecord {
                event_id,
                action: ApprovalAction::Submitted,
                performed_by: actor.user_id,
                performer_name,
                comments: None,
                status_before: event.status,
                status_after: EventStatus::PendingApproval,
            },
        )
        .await?;
        tx.commit().await?;

        info!(event_id = event_id, user_id = actor.user_id, "Event submitted for approval");
        Ok(updated)
    }

    /// Approve a pending event, publishing it.
    pub async fn approve_event(
        &self,
        event_id: i64,
        actor: &Actor,
        comments: Option<String>,
    ) -> Result<Event> {
        let performer_name = self.resolve_performer_name(actor.user_id).await?;
        let now = self.clock.now();

        let mut tx = self.pool.begin().await?;
        let event = EventRepository::lock_by_id(&mut tx, event_id)
            .await?
            .ok_or(CampusHubError::EventNotFound { event_id })?;
        transitions::check_approve(&event, actor, now)?;

        let updated = EventRepository::mark_approved(&mut tx, event_id, actor.user_id, now).await?;
        ApprovalHistoryRepository::append(
            &mut tx,
            NewApprovalRecord {
                event_id,
                action: ApprovalAction::Approved,
                performed_by: actor.user_id,
                performer_name: performer_name.clone(),
                comments,
                status_before: event.status,
                status_after: EventStatus::Published,
            },
        )
        .await?;
        tx.commit().await?;

        info!(
            event_id = event_id,
            approver_id = actor.user_id,
            "Event approved and published"
        );
        self.notify_creator_approved(&updated, &performer_name);
        Ok(updated)
    }

    /// Send a pending event back to its creator with comments.
    pub async fn request_revision(
        &self,
        event_id: i64,
        actor: &Actor,
        comments: &str,
    ) -> Result<Event> {
        let performer_name = self.resolve_performer_name(actor.user_id).await?;

        let mut tx = self.pool.begin().await?;
        let event = EventRepository::lock_by_id(&mut tx, event_id)
            .await?
            .ok_or(CampusHubError::EventNotFound { event_id })?;
        transitions::check_request_revision(&event, actor, comments)?;

        let updated = EventRepository::mark_revision_requested(&mut tx, event_id, comments).await?;
        ApprovalHistoryRepository::append(
            &mut tx,
            NewApprovalRecord {
                event_id,
                action: ApprovalAction::RevisionRequested,
                performed_by: actor.user_id,
                performer_name,
                comments: Some(comments.to_string()),
                status_before: event.status,
                status_after: EventStatus::RevisionRequested,
            },
        )
        .await?;
        tx.commit().await?;

        info!(
            event_id = event_id,
            reviewer_id = actor.user_id,
            "Revision requested for event"
        );
        Ok(updated)
    }

    /// Publish a draft directly, skipping the review queue. Staff only;
    /// the actor is recorded as the approver.
    pub async fn publish_event(&self, event_id: i64, actor: &Actor) -> Result<Event> {
        let now = self.clock.now();

        let mut tx = self.pool.begin().await?;
        let event = EventRepository::lock_by_id(&mut tx, event_id)
            .await?
            .ok_or(CampusHubError::EventNotFound { event_id })?;
        transitions::check_publish_direct(&event, actor, now)?;

        let updated = EventRepository::mark_approved(&mut tx, event_id, actor.user_id, now).await?;
        tx.commit().await?;

        info!(event_id = event_id, user_id = actor.user_id, "Event published directly");
        Ok(updated)
    }

    /// Cancel a non-terminal event.
    pub async fn cancel_event(&self, event_id: i64, actor: &Actor) -> Result<Event> {
        let mut tx = self.pool.begin().await?;
        let event = EventRepository::lock_by_id(&mut tx, event_id)
            .await?
            .ok_or(CampusHubError::EventNotFound { event_id })?;
        transitions::check_cancel(&event, actor)?;

        let updated = EventRepository::set_status(&mut tx, event_id, EventStatus::Cancelled).await?;
        tx.commit().await?;

        info!(event_id = event_id, user_id = actor.user_id, "Event cancelled");
        Ok(updated)
    }

    /// Mark a published event as completed after it has taken place.
    pub async fn complete_event(&self, event_id: i64, actor: &Actor) -> Result<Event> {
        let now = self.clock.now();

        let mut tx = self.pool.begin().await?;
        let event = EventRepository::lock_by_id(&mut tx, event_id)
            .await?
            .ok_or(CampusHubError::EventNotFound { event_id })?;
        transitions::check_complete(&event, actor, now)?;

        let updated = EventRepository::set_status(&mut tx, event_id, EventStatus::Completed).await?;
        tx.commit().await?;

        info!(event_id = event_id, user_id = actor.user_id, "Event completed");
        Ok(updated)
    }

    /// Approval history for an event, oldest first.
    pub async fn approval_history(&self, event_id: i64) -> Result<Vec<EventApprovalHistory>> {
        self.db.approval_history.list_for_event(event_id).await
    }

    /// The denormalized performer name captured on history records,
    /// resolved at call time.
    async fn resolve_performer_name(&self, user_id: i64) -> Result<String> {
        let user = self
            .db
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(CampusHubError::UserNotFound { user_id })?;
        Ok(user.name)
    }

    /// Fire-and-forget approval notification to the event creator.
    fn notify_creator_approved(&self, event: &Event, approver_name: &str) {
        let db = self.db.clone();
        let notifications = self.notifications.clone();
        let event_id = event.id;
        let creator_id = event.created_by;
        let mut params = HashMap::new();
        params.insert("event_title".to_string(), event.title.clone());
        params.insert("approver_name".to_string(), approver_name.to_string());
        params.insert(
            "event_date".to_string(),
            event.event_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        );

        tokio::spawn(async move {
            let creator = match db.users.find_by_id(creator_id).await {
                Ok(Some(user)) => user,
                Ok(None) => {
                    warn!(event_id, creator_id, "Creator not found for approval notification");
                    return;
                }
                Err(e) => {
                    warn!(event_id, creator_id, error = %e, "Failed to load creator for approval notification");
                    return;
                }
            };
            if let Err(e) = notifications
                .send_batch(&[creator], TemplateKind::EventApproved, &params)
                .await
            {
                warn!(event_id, error = %e, "Failed to send approval notification");
            }
        });
    }
}
