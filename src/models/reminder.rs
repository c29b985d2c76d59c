//! Reminder log model
//!
//! Persisted record of reminder batches already sent. A row with a NULL
//! user id marks a batch send to every eligible recipient and is the
//! de-duplication guard for the periodic scan.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reminder_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReminderType {
    EventAttendance,
    RegistrationDeadline,
}

impl ReminderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderType::EventAttendance => "event_attendance",
            ReminderType::RegistrationDeadline => "registration_deadline",
        }
    }
}

impl std::fmt::Display for ReminderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReminderLog {
    pub id: i64,
    pub event_id: i64,
    pub user_id: Option<i64>,
    pub reminder_type: ReminderType,
    pub sent_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
