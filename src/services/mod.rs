//! Services module
//!
//! This module contains business logic services

pub mod event;
pub mod lifecycle;
pub mod notification;
pub mod registration;
pub mod reminder;

// Re-export commonly used services
pub use event::EventService;
pub use lifecycle::LifecycleService;
pub use notification::{EmailMessage, Mailer, NoopMailer, NotificationService, NotificationStats, TemplateKind};
pub use registration::RegistrationService;
pub use reminder::{ReminderScheduler, ReminderWindow};

use std::sync::Arc;
use sqlx::PgPool;
use crate::config::Settings;
use crate::database::DatabaseService;
use crate::utils::clock::SharedClock;

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub events: EventService,
    pub lifecycle: LifecycleService,
    pub registrations: RegistrationService,
    pub notifications: Arc<NotificationService>,
    db: DatabaseService,
    clock: SharedClock,
    settings: Settings,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(
        pool: PgPool,
        settings: Settings,
        mailer: Box<dyn Mailer>,
        clock: SharedClock,
    ) -> Self {
        let db = DatabaseService::new(pool.clone());
        let notifications = Arc::new(NotificationService::new(
            mailer,
            settings.notifications.clone(),
        ));

        let events = EventService::new(db.clone(), clock.clone());
        let lifecycle = LifecycleService::new(
            pool.clone(),
            db.clone(),
            notifications.clone(),
            clock.clone(),
        );
        let registrations =
            RegistrationService::new(pool, db.clone(), notifications.clone(), clock.clone());

        Self {
            events,
            lifecycle,
            registrations,
            notifications,
            db,
            clock,
            settings,
        }
    }

    /// Build the reminder scheduler; callers own starting it.
    pub fn reminder_scheduler(&self) -> ReminderScheduler {
        ReminderScheduler::new(
            self.db.clone(),
            self.notifications.clone(),
            self.clock.clone(),
            &self.settings.scheduler,
        )
    }

    /// Direct repository access for read paths and admin tooling.
    pub fn database(&self) -> &DatabaseService {
        &self.db
    }
}
