//! Reminder scheduler and deduplication
//!
//! Periodic scan for events crossing the reminder lead time. The scan
//! window is wider than the tick interval so a delayed tick cannot skip
//! an event, and the persisted batch log makes delivery at-most-once per
//! (event, reminder type) across repeated ticks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use tokio::time::interval;
use tracing::{debug, info, warn};
use uuid::Uuid;
use crate::config::SchedulerConfig;
use crate::database::DatabaseService;
use crate::models::{Event, ReminderType, User};
use crate::services::notification::{NotificationService, TemplateKind};
use crate::utils::clock::SharedClock;
use crate::utils::errors::Result;

/// Scan window centred on `now + lead`.
#[derive(Debug, Clone, Copy)]
pub struct ReminderWindow {
    pub lead: Duration,
    pub width: Duration,
}

impl ReminderWindow {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            lead: Duration::hours(config.reminder_lead_hours),
            width: Duration::minutes(config.reminder_window_minutes),
        }
    }

    /// Inclusive bounds of the window for a given instant.
    pub fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let center = now + self.lead;
        let half = self.width / 2;
        (center - half, center + half)
    }

    pub fn contains(&self, now: DateTime<Utc>, target: DateTime<Utc>) -> bool {
        let (from, to) = self.bounds(now);
        from <= target && target <= to
    }
}

/// Periodic reminder scanner.
pub struct ReminderScheduler {
    db: DatabaseService,
    notifications: Arc<NotificationService>,
    clock: SharedClock,
    tick: StdDuration,
    window: ReminderWindow,
}

impl ReminderScheduler {
    pub fn new(
        db: DatabaseService,
        notifications: Arc<NotificationService>,
        clock: SharedClock,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            db,
            notifications,
            clock,
            tick: StdDuration::from_secs(config.tick_seconds),
            window: ReminderWindow::from_config(config),
        }
    }

    /// Start the scheduler background task.
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        info!(
            tick_seconds = self.tick.as_secs(),
            "Starting reminder scheduler"
        );
        tokio::spawn(async move {
            let mut ticker = interval(self.tick);

            loop {
                ticker.tick().await;
                self.run_tick().await;
            }
        })
    }

    /// One scheduler tick: both scans, independently.
    pub async fn run_tick(&self) {
        if let Err(e) = self.attendance_scan().await {
            warn!(error = %e, "Attendance reminder scan failed");
        }
        if let Err(e) = self.deadline_scan().await {
            warn!(error = %e, "Registration deadline reminder scan failed");
        }
    }

    /// Remind registered attendees of events starting a day out.
    pub async fn attendance_scan(&self) -> Result<()> {
        let now = self.clock.now();
        let (from, to) = self.window.bounds(now);
        let events = self.db.events.published_starting_between(from, to).await?;

        if events.is_empty() {
            return Ok(());
        }
        debug!(count = events.len(), "Events in attendance reminder window");

        let results = join_all(
            events
                .iter()
                .map(|event| self.process_event(event, ReminderType::EventAttendance)),
        )
        .await;
        for (event, result) in events.iter().zip(results) {
            if let Err(e) = result {
                warn!(event_id = event.id, error = %e, "Attendance reminder failed for event");
            }
        }

        Ok(())
    }

    /// Remind not-yet-registered users of closing registration windows.
    pub async fn deadline_scan(&self) -> Result<()> {
        let now = self.clock.now();
        let (from, to) = self.window.bounds(now);
        let events = self
            .db
            .events
            .published_registration_ending_between(from, to)
            .await?;

        if events.is_empty() {
            return Ok(());
        }
        debug!(count = events.len(), "Events in deadline reminder window");

        let results = join_all(
            events
                .iter()
                .map(|event| self.process_event(event, ReminderType::RegistrationDeadline)),
        )
        .await;
        for (event, result) in events.iter().zip(results) {
            if let Err(e) = result {
                warn!(event_id = event.id, error = %e, "Deadline reminder failed for event");
            }
        }

        Ok(())
    }

    /// Send one batch reminder for an event unless the dedup log already
    /// has it.
    async fn process_event(&self, event: &Event, reminder_type: ReminderType) -> Result<()> {
        if self.db.reminder_logs.batch_exists(event.id, reminder_type).await? {
            debug!(
                event_id = event.id,
                reminder_type = %reminder_type,
                "Reminder already sent, skipping"
            );
            return Ok(());
        }

        let recipients = self.recipients_for(event, reminder_type).await?;
        let batch_id = Uuid::new_v4();

        if recipients.is_empty() {
            debug!(
                event_id = event.id,
                reminder_type = %reminder_type,
                "No recipients for reminder"
            );
        } else {
            let kind = match reminder_type {
                ReminderType::EventAttendance => TemplateKind::EventAttendanceReminder,
                ReminderType::RegistrationDeadline => TemplateKind::RegistrationDeadlineReminder,
            };
            self.notifications
                .send_batch(&recipients, kind, &self.template_params(event))
                .await?;
            info!(
                event_id = event.id,
                reminder_type = %reminder_type,
                recipients = recipients.len(),
                batch_id = %batch_id,
                "Reminder batch sent"
            );
        }

        let recorded = self
            .db
            .reminder_logs
            .record_batch(event.id, reminder_type, self.clock.now())
            .await?;
        if !recorded {
            debug!(
                event_id = event.id,
                reminder_type = %reminder_type,
                "Another tick recorded this reminder first"
            );
        }

        Ok(())
    }

    async fn recipients_for(&self, event: &Event, reminder_type: ReminderType) -> Result<Vec<User>> {
        match reminder_type {
            ReminderType::EventAttendance => {
                self.db.users.find_registered_for_event(event.id).await
            }
            ReminderType::RegistrationDeadline => {
                self.db.users.find_without_active_registration(event.id).await
            }
        }
    }

    fn template_params(&self, event: &Event) -> HashMap<String, String> {
        let mut params = HashMap::new();
        params.insert("event_title".to_string(), event.title.clone());
        params.insert(
            "event_date".to_string(),
            event.event_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        );
        params.insert(
            "registration_ends".to_string(),
            event
                .registration_ends_at
                .format("%Y-%m-%d %H:%M UTC")
                .to_string(),
        );
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window() -> ReminderWindow {
        ReminderWindow {
            lead: Duration::hours(24),
            width: Duration::minutes(30),
        }
    }

    #[test]
    fn test_window_bounds_centred_on_lead() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let (from, to) = window().bounds(now);
        assert_eq!(from, now + Duration::hours(23) + Duration::minutes(45));
        assert_eq!(to, now + Duration::hours(24) + Duration::minutes(15));
    }

    #[test]
    fn test_window_contains_event_a_day_out() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let w = window();
        assert!(w.contains(now, now + Duration::hours(24)));
        assert!(w.contains(now, now + Duration::hours(23) + Duration::minutes(45)));
        assert!(w.contains(now, now + Duration::hours(24) + Duration::minutes(15)));
        assert!(!w.contains(now, now + Duration::hours(23)));
        assert!(!w.contains(now, now + Duration::hours(25)));
    }

    #[test]
    fn test_successive_ticks_cover_contiguously() {
        // Two ticks a minute apart: their windows overlap, so an event
        // between them is seen by at least one tick.
        let w = window();
        let t0 = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let t1 = t0 + Duration::minutes(1);
        let (_, to0) = w.bounds(t0);
        let (from1, _) = w.bounds(t1);
        assert!(from1 < to0);
    }

    #[test]
    fn test_window_from_config() {
        let config = SchedulerConfig {
            tick_seconds: 60,
            reminder_lead_hours: 24,
            reminder_window_minutes: 30,
        };
        let w = ReminderWindow::from_config(&config);
        assert_eq!(w.lead, Duration::hours(24));
        assert_eq!(w.width, Duration::minutes(30));
    }
}
