//! Registration and waitlist allocator
//!
//! Capacity decisions run inside one transaction holding the event row
//! lock, so two concurrent registrations can never both observe the last
//! free seat. Counts are always computed from live rows.

use std::collections::HashMap;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, info, warn};
use crate::database::{DatabaseService, EventRepository, RegistrationRepository};
use crate::models::{
    Actor, Event, EventRegistration, EventStatus, RegistrationCounts, RegistrationStats,
    RegistrationStatus, User,
};
use crate::services::notification::{NotificationService, TemplateKind};
use crate::utils::clock::SharedClock;
use crate::utils::errors::{CampusHubError, Result};

/// Pure allocation rules, separated from persistence.
pub mod allocation {
    use super::*;

    /// An event accepts registrations while published, upcoming and
    /// inside its registration window.
    pub fn check_event_open(event: &Event, now: DateTime<Utc>) -> Result<()> {
        if event.status != EventStatus::Published {
            return Err(CampusHubError::Validation(
                "Event is not open for registration".to_string(),
            ));
        }
        if event.is_past(now) {
            return Err(CampusHubError::EventInPast);
        }
        if !event.registration_window_open(now) {
            return Err(CampusHubError::Validation(
                "Registration window is closed".to_string(),
            ));
        }
        Ok(())
    }

    /// Capacity decision for a fresh (or reactivated) registration.
    pub fn decide(registered_count: i64, max_attendees: Option<i32>) -> RegistrationStatus {
        match max_attendees {
            Some(max) if registered_count >= max as i64 => RegistrationStatus::Waitlisted,
            _ => RegistrationStatus::Registered,
        }
    }

    /// Whether the registered count has reached capacity. Events without
    /// a limit are never full.
    pub fn is_full(registered_count: i64, max_attendees: Option<i32>) -> bool {
        matches!(max_attendees, Some(max) if registered_count >= max as i64)
    }

    /// Derived stats view over live counts.
    pub fn compute_stats(
        event: &Event,
        counts: RegistrationCounts,
        now: DateTime<Utc>,
    ) -> RegistrationStats {
        let full = is_full(counts.registered, event.max_attendees);
        let can_register = event.status == EventStatus::Published
            && event.registration_window_open(now)
            && !full
            && !event.is_past(now);
        RegistrationStats {
            event_id: event.id,
            counts,
            is_full: full,
            can_register,
        }
    }
}

/// Service owning all registration-row mutations.
#[derive(Clone)]
pub struct RegistrationService {
    pool: PgPool,
    db: DatabaseService,
    notifications: Arc<NotificationService>,
    clock: SharedClock,
}

impl RegistrationService {
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

    /// Register the caller for a published event, waitlisting when full.
    /// A previously cancelled registration is reactivated in place and
    /// goes through the same capacity decision as a fresh one.
    pub async fn register_for_event(
        &self,
        event_id: i64,
        actor: &Actor,
    ) -> Result<EventRegistration> {
        let user = self
            .db
            .users
            .find_by_id(actor.user_id)
            .await?
            .ok_or(CampusHubError::UserNotFound {
                user_id: actor.user_id,
            })?;
        let now = self.clock.now();

        let mut tx = self.pool.begin().await?;
        let event = EventRepository::lock_by_id(&mut tx, event_id)
            .await?
            .ok_or(CampusHubError::EventNotFound { event_id })?;

        allocation::check_event_open(&event, now)?;
        if !event.category_allowed(user.category.as_deref()) {
            return Err(CampusHubError::CategoryRestricted);
        }

        let existing =
            RegistrationRepository::find_by_event_and_user_tx(&mut tx, event_id, actor.user_id)
                .await?;
        match &existing {
            Some(r) if r.status == RegistrationStatus::Registered => {
                return Err(CampusHubError::AlreadyRegistered);
            }
            Some(r) if r.status == RegistrationStatus::Waitlisted => {
                return Err(CampusHubError::AlreadyWaitlisted);
            }
            _ => {}
        }

        let registered_count =
            RegistrationRepository::count_by_status_tx(&mut tx, event_id, RegistrationStatus::Registered)
                .await?;
        let status = allocation::decide(registered_count, event.max_attendees);

        let registration = match existing {
            Some(cancelled_row) => {
                RegistrationRepository::reactivate(&mut tx, cancelled_row.id, status, now).await?
            }
            None => {
                RegistrationRepository::insert(&mut tx, event_id, actor.user_id, status, now).await?
            }
        };
        tx.commit().await?;

        info!(
            event_id = event_id,
            user_id = actor.user_id,
            status = %registration.status,
            "Registration created"
        );
        self.notify_registration_confirmed(&event, user, registration.status);
        Ok(registration)
    }

    /// Cancel a registration. Vacating a registered seat promotes the
    /// earliest waitlisted registrant, at most one per vacancy.
    pub async fn unregister_from_event(
        &self,
        event_id: i64,
        user_id: i64,
        actor: &Actor,
    ) -> Result<EventRegistration> {
        if actor.user_id != user_id && !actor.role.is_staff() {
            return Err(CampusHubError::PermissionDenied(
                "Only the registrant or staff can cancel a registration".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        let event = EventRepository::lock_by_id(&mut tx, event_id)
            .await?
            .ok_or(CampusHubError::EventNotFound { event_id })?;

        let existing =
            RegistrationRepository::find_by_event_and_user_tx(&mut tx, event_id, user_id).await?;
        let registration = match existing {
            Some(r) if r.status.is_active() => r,
            _ => return Err(CampusHubError::NotRegistered),
        };

        let vacated_seat = registration.status == RegistrationStatus::Registered;
        let cancelled =
            RegistrationRepository::set_status(&mut tx, registration.id, RegistrationStatus::Cancelled)
                .await?;

        let promoted = if vacated_seat {
            match RegistrationRepository::earliest_waitlisted(&mut tx, event_id).await? {
                Some(candidate) => Some(
                    RegistrationRepository::set_status(
                        &mut tx,
                        candidate.id,
                        RegistrationStatus::Registered,
                    )
                    .await?,
                ),
                None => None,
            }
        } else {
            None
        };
        tx.commit().await?;

        info!(
            event_id = event_id,
            user_id = user_id,
            promoted_user = promoted.as_ref().map(|p| p.user_id),
            "Registration cancelled"
        );
        if let Some(promoted) = promoted {
            self.notify_waitlist_promoted(&event, promoted.user_id);
        }
        Ok(cancelled)
    }

    /// Live registration counts plus the derived availability flags.
    pub async fn registration_stats(&self, event_id: i64) -> Result<RegistrationStats> {
        let event = self
            .db
            .events
            .find_by_id(event_id)
            .await?
            .ok_or(CampusHubError::EventNotFound { event_id })?;
        let counts = self.db.registrations.counts_for_event(event_id).await?;
        Ok(allocation::compute_stats(&event, counts, self.clock.now()))
    }

    /// All registration rows for an event in registration order.
    pub async fn list_event_registrations(&self, event_id: i64) -> Result<Vec<EventRegistration>> {
        self.db.registrations.list_for_event(event_id).await
    }

    fn notify_registration_confirmed(&self, event: &Event, user: User, status: RegistrationStatus) {
        let notifications = self.notifications.clone();
        let mut params = HashMap::new();
        params.insert("event_title".to_string(), event.title.clone());
        params.insert(
            "event_date".to_string(),
            event.event_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        );
        params.insert("status".to_string(), status.to_string());
        let event_id = event.id;

        tokio::spawn(async move {
            if let Err(e) = notifications
                .send_batch(&[user], TemplateKind::RegistrationConfirmed, &params)
                .await
            {
                warn!(event_id, error = %e, "Failed to send registration confirmation");
            }
        });
    }

    fn notify_waitlist_promoted(&self, event: &Event, promoted_user_id: i64) {
        let db = self.db.clone();
        let notifications = self.notifications.clone();
        let mut params = HashMap::new();
        params.insert("event_title".to_string(), event.title.clone());
        params.insert(
            "event_date".to_string(),
            event.event_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        );
        let event_id = event.id;

        tokio::spawn(async move {
            let user = match db.users.find_by_id(promoted_user_id).await {
                Ok(Some(user)) => user,
                Ok(None) => {
                    debug!(event_id, promoted_user_id, "Promoted user vanished before notification");
                    return;
                }
                Err(e) => {
                    warn!(event_id, promoted_user_id, error = %e, "Failed to load promoted user");
                    return;
                }
            };
            if let Err(e) = notifications
                .send_batch(&[user], TemplateKind::WaitlistPromoted, &params)
                .await
            {
                warn!(event_id, error = %e, "Failed to send waitlist promotion notification");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::allocation::*;
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone};

    fn published_event(max_attendees: Option<i32>) -> (Event, DateTime<Utc>) {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let event_at = now + Duration::days(2);
        let event = Event {
            id: 42,
            title: "Spring Concert".to_string(),
            description: None,
            event_at,
            registration_starts_at: now - Duration::days(7),
            registration_ends_at: event_at - Duration::hours(2),
            location_id: None,
            max_attendees,
            created_by: 1,
            status: EventStatus::Published,
            approved_by: Some(2),
            approval_date: Some(now - Duration::days(3)),
            revision_comments: None,
            allowed_categories: None,
            created_at: now - Duration::days(10),
            updated_at: now - Duration::days(3),
        };
        (event, now)
    }

    #[test]
    fn test_decide_respects_capacity() {
        assert_eq!(decide(0, Some(2)), RegistrationStatus::Registered);
        assert_eq!(decide(1, Some(2)), RegistrationStatus::Registered);
        assert_eq!(decide(2, Some(2)), RegistrationStatus::Waitlisted);
        assert_eq!(decide(5, Some(2)), RegistrationStatus::Waitlisted);
    }

    #[test]
    fn test_decide_unlimited_when_no_cap() {
        assert_eq!(decide(10_000, None), RegistrationStatus::Registered);
    }

    #[test]
    fn test_is_full() {
        assert!(!is_full(1, Some(2)));
        assert!(is_full(2, Some(2)));
        assert!(!is_full(999, None));
    }

    #[test]
    fn test_check_event_open_accepts_published_future_event() {
        let (event, now) = published_event(Some(10));
        assert!(check_event_open(&event, now).is_ok());
    }

    #[test]
    fn test_check_event_open_rejects_draft() {
        let (mut event, now) = published_event(Some(10));
        event.status = EventStatus::Draft;
        assert_matches!(check_event_open(&event, now), Err(CampusHubError::Validation(_)));
    }

    #[test]
    fn test_check_event_open_rejects_past_event() {
        let (event, _) = published_event(Some(10));
        let late = event.event_at + Duration::hours(1);
        assert_matches!(check_event_open(&event, late), Err(CampusHubError::EventInPast));
    }

    #[test]
    fn test_check_event_open_rejects_closed_window() {
        let (event, _) = published_event(Some(10));
        let before_open = event.registration_starts_at - Duration::hours(1);
        assert_matches!(
            check_event_open(&event, before_open),
            Err(CampusHubError::Validation(_))
        );
        let after_close = event.registration_ends_at + Duration::minutes(1);
        assert_matches!(
            check_event_open(&event, after_close),
            Err(CampusHubError::Validation(_))
        );
    }

    #[test]
    fn test_compute_stats_full_event() {
        let (event, now) = published_event(Some(2));
        let counts = RegistrationCounts {
            registered: 2,
            waitlisted: 3,
            cancelled: 1,
        };
        let stats = compute_stats(&event, counts, now);
        assert!(stats.is_full);
        assert!(!stats.can_register);
        assert_eq!(stats.counts.registered, 2);
        assert_eq!(stats.counts.waitlisted, 3);
    }

    #[test]
    fn test_compute_stats_open_event() {
        let (event, now) = published_event(Some(2));
        let counts = RegistrationCounts {
            registered: 1,
            waitlisted: 0,
            cancelled: 0,
        };
        let stats = compute_stats(&event, counts, now);
        assert!(!stats.is_full);
        assert!(stats.can_register);
    }

    #[test]
    fn test_compute_stats_uncapped_event_never_full() {
        let (event, now) = published_event(None);
        let counts = RegistrationCounts {
            registered: 500,
            waitlisted: 0,
            cancelled: 0,
        };
        let stats = compute_stats(&event, counts, now);
        assert!(!stats.is_full);
        assert!(stats.can_register);
    }

    #[test]
    fn test_compute_stats_window_closed() {
        let (event, _) = published_event(Some(10));
        let after_close = event.registration_ends_at + Duration::minutes(5);
        let stats = compute_stats(&event, RegistrationCounts::default(), after_close);
        assert!(!stats.can_register);
    }
}
