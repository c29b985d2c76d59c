//! Repository implementations

pub mod approval_history;
pub mod event;
pub mod location;
pub mod registration;
pub mod reminder_log;
pub mod user;

pub use approval_history::ApprovalHistoryRepository;
pub use event::EventRepository;
pub use location::LocationRepository;
pub use registration::RegistrationRepository;
pub use reminder_log::ReminderLogRepository;
pub use user::UserRepository;
