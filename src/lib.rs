//! CampusHub event management backend
//!
//! A campus event management backend built around an approval workflow,
//! capacity-aware registration with a waitlist, and a periodic reminder
//! scheduler with at-most-once delivery. The outer transport (HTTP
//! routing, authentication, mail delivery) lives behind thin collaborator
//! interfaces; this library owns the event lifecycle and registration
//! engine.

pub mod config;
pub mod database;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{CampusHubError, Result};

// Re-export main components for easy access
pub use database::DatabaseService;
pub use services::ServiceFactory;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
