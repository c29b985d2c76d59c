//! Database service layer
//!
//! Bundles the repositories behind one constructor so wiring stays in one
//! place.

use crate::database::{
    ApprovalHistoryRepository, DatabasePool, EventRepository, LocationRepository,
    RegistrationRepository, ReminderLogRepository, UserRepository,
};

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pub users: UserRepository,
    pub locations: LocationRepository,
    pub events: EventRepository,
    pub registrations: RegistrationRepository,
    pub approval_history: ApprovalHistoryRepository,
    pub reminder_logs: ReminderLogRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            locations: LocationRepository::new(pool.clone()),
            events: EventRepository::new(pool.clone()),
            registrations: RegistrationRepository::new(pool.clone()),
            approval_history: ApprovalHistoryRepository::new(pool.clone()),
            reminder_logs: ReminderLogRepository::new(pool),
        }
    }
}
