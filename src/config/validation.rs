//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{CampusHubError, Result};
use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_database_config(&settings.database)?;
    validate_scheduler_config(&settings.scheduler)?;
    validate_notification_config(&settings.notifications)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(CampusHubError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(CampusHubError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(CampusHubError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    Ok(())
}

/// Validate reminder scheduler configuration
fn validate_scheduler_config(config: &super::SchedulerConfig) -> Result<()> {
    if config.tick_seconds == 0 {
        return Err(CampusHubError::Config(
            "Scheduler tick interval must be greater than 0".to_string()
        ));
    }

    if config.reminder_lead_hours <= 0 {
        return Err(CampusHubError::Config(
            "Reminder lead time must be greater than 0".to_string()
        ));
    }

    // The scan window must cover at least one full tick, otherwise a
    // delayed tick can let an event cross the window unseen.
    if config.reminder_window_minutes * 60 <= config.tick_seconds as i64 {
        return Err(CampusHubError::Config(
            "Reminder window must be wider than the tick interval".to_string()
        ));
    }

    Ok(())
}

/// Validate notification configuration
fn validate_notification_config(config: &super::NotificationConfig) -> Result<()> {
    if config.enabled && config.sender_address.is_empty() {
        return Err(CampusHubError::Config(
            "Notification sender address is required when notifications are enabled".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(CampusHubError::Config(
            "Logging level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(CampusHubError::Config(
            format!("Invalid logging level: {}", config.level)
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_window_narrower_than_tick_rejected() {
        let mut settings = Settings::default();
        settings.scheduler.tick_seconds = 3600;
        settings.scheduler.reminder_window_minutes = 30;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_zero_max_connections_rejected() {
        let mut settings = Settings::default();
        settings.database.max_connections = 0;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_bogus_log_level_rejected() {
        let mut settings = Settings::default();
        settings.logging.level = "loud".to_string();
        assert!(validate_settings(&settings).is_err());
    }
}
