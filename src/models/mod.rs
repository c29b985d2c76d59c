//! Data models

pub mod approval;
pub mod event;
pub mod location;
pub mod registration;
pub mod reminder;
pub mod user;

pub use approval::{ApprovalAction, EventApprovalHistory, NewApprovalRecord};
pub use event::{CreateEventRequest, Event, EventStatus, UpdateEventRequest};
pub use location::{CreateLocationRequest, Location};
pub use registration::{EventRegistration, RegistrationCounts, RegistrationStats, RegistrationStatus};
pub use reminder::{ReminderLog, ReminderType};
pub use user::{Actor, CreateUserRequest, User, UserRole};
