//! Notification service implementation
//!
//! This service handles message formatting and batch delivery through a
//! pluggable mailer. Delivery is fire-and-forget: transport failures are
//! counted and logged, never propagated, so a failed send can never roll
//! back or fail the state change that triggered it.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use crate::config::NotificationConfig;
use crate::models::User;
use crate::utils::errors::{CampusHubError, Result};

/// Outbound email message handed to the mailer
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Delivery transport. Implementations live outside the core; the
/// default is a no-op that logs and drops.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<()>;
}

/// Mailer used when real delivery is absent. Always succeeds.
#[derive(Debug, Clone, Default)]
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        debug!(
            recipients = message.to.len(),
            subject = %message.subject,
            "NoopMailer: dropping outbound message"
        );
        Ok(())
    }
}

/// Template kinds the core sends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    EventApproved,
    EventAttendanceReminder,
    RegistrationDeadlineReminder,
    RegistrationConfirmed,
    WaitlistPromoted,
}

impl TemplateKind {
    pub fn key(&self) -> &'static str {
        match self {
            TemplateKind::EventApproved => "event_approved",
            TemplateKind::EventAttendanceReminder => "event_attendance_reminder",
            TemplateKind::RegistrationDeadlineReminder => "registration_deadline_reminder",
            TemplateKind::RegistrationConfirmed => "registration_confirmed",
            TemplateKind::WaitlistPromoted => "waitlist_promoted",
        }
    }
}

/// Message template structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub subject: String,
    pub body: String,
}

/// Notification statistics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationStats {
    pub total_sent: u64,
    pub total_failed: u64,
    pub sent_by_template: HashMap<String, u64>,
}

/// Notification service for batch message handling
pub struct NotificationService {
    mailer: Box<dyn Mailer>,
    config: NotificationConfig,
    templates: HashMap<&'static str, MessageTemplate>,
    total_sent: AtomicU64,
    total_failed: AtomicU64,
    sent_by_template: Mutex<HashMap<String, u64>>,
}

impl NotificationService {
    /// Create a new NotificationService instance
    pub fn new(mailer: Box<dyn Mailer>, config: NotificationConfig) -> Self {
        Self {
            mailer,
            config,
            templates: Self::load_default_templates(),
            total_sent: AtomicU64::new(0),
            total_failed: AtomicU64::new(0),
            sent_by_template: Mutex::new(HashMap::new()),
        }
    }

    /// Send one batch message to all recipients. Transport failures are
    /// swallowed; only a missing template surfaces as an error.
    pub async fn send_batch(
        &self,
        recipients: &[User],
        kind: TemplateKind,
        parameters: &HashMap<String, String>,
    ) -> Result<()> {
        if recipients.is_empty() {
            debug!(template = kind.key(), "No recipients, skipping batch send");
            return Ok(());
        }

        if !self.config.enabled {
            debug!(template = kind.key(), "Notifications disabled, skipping batch send");
            return Ok(());
        }

        let (subject, body) = self.format_message(kind, parameters)?;
        let message = EmailMessage {
            from: self.config.sender_address.clone(),
            to: recipients.iter().map(|u| u.email.clone()).collect(),
            subject,
            body,
        };

        let count = recipients.len() as u64;
        match self.mailer.send(message).await {
            Ok(()) => {
                self.total_sent.fetch_add(count, Ordering::Relaxed);
                let mut by_template = self.sent_by_template.lock().unwrap_or_else(|e| e.into_inner());
                *by_template.entry(kind.key().to_string()).or_insert(0) += count;
                info!(
                    template = kind.key(),
                    recipients = recipients.len(),
                    "Batch notification sent"
                );
            }
            Err(e) => {
                self.total_failed.fetch_add(count, Ordering::Relaxed);
                error!(
                    template = kind.key(),
                    recipients = recipients.len(),
                    error = %e,
                    "Failed to send batch notification"
                );
            }
        }

        Ok(())
    }

    /// Format subject and body for a template kind
    fn format_message(
        &self,
        kind: TemplateKind,
        parameters: &HashMap<String, String>,
    ) -> Result<(String, String)> {
        let template = self.templates.get(kind.key()).ok_or_else(|| {
            CampusHubError::Config(format!("Template not found: {}", kind.key()))
        })?;

        let mut subject = template.subject.clone();
        let mut body = template.body.clone();
        for (key, value) in parameters {
            let placeholder = format!("{{{}}}", key);
            subject = subject.replace(&placeholder, value);
            body = body.replace(&placeholder, value);
        }

        Ok((subject, body))
    }

    /// Get notification statistics
    pub fn stats(&self) -> NotificationStats {
        let by_template = self
            .sent_by_template
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        NotificationStats {
            total_sent: self.total_sent.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
            sent_by_template: by_template,
        }
    }

    /// Load default message templates
    fn load_default_templates() -> HashMap<&'static str, MessageTemplate> {
        let mut templates = HashMap::new();

        templates.insert(
            TemplateKind::EventApproved.key(),
            MessageTemplate {
                subject: "Your event \"{event_title}\" has been approved".to_string(),
                body: "Good news! \"{event_title}\" was approved by {approver_name} and is now published.\n\nEvent date: {event_date}".to_string(),
            },
        );

        templates.insert(
            TemplateKind::EventAttendanceReminder.key(),
            MessageTemplate {
                subject: "Reminder: \"{event_title}\" is tomorrow".to_string(),
                body: "This is a reminder that \"{event_title}\" takes place on {event_date}.\n\nSee you there!".to_string(),
            },
        );

        templates.insert(
            TemplateKind::RegistrationDeadlineReminder.key(),
            MessageTemplate {
                subject: "Registration for \"{event_title}\" closes soon".to_string(),
                body: "Registration for \"{event_title}\" closes on {registration_ends}.\n\nSign up before the deadline if you want to attend.".to_string(),
            },
        );

        templates.insert(
            TemplateKind::RegistrationConfirmed.key(),
            MessageTemplate {
                subject: "You are registered for \"{event_title}\"".to_string(),
                body: "Your registration for \"{event_title}\" on {event_date} is confirmed with status: {status}.".to_string(),
            },
        );

        templates.insert(
            TemplateKind::WaitlistPromoted.key(),
            MessageTemplate {
                subject: "A seat opened up for \"{event_title}\"".to_string(),
                body: "You have been moved off the waitlist and now hold a seat for \"{event_title}\" on {event_date}.".to_string(),
            },
        );

        templates
    }
}

impl std::fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationService")
            .field("enabled", &self.config.enabled)
            .field("templates", &self.templates.len())
            .finish()
    }
}

/// Test mailer that records messages and can be told to fail.
#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingMailer {
        pub messages: Mutex<Vec<EmailMessage>>,
        pub fail: bool,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: EmailMessage) -> Result<()> {
            if self.fail {
                return Err(CampusHubError::Validation("mailer down".to_string()));
            }
            self.messages.lock().unwrap().push(message);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::models::UserRole;

    fn test_user(id: i64, email: &str) -> User {
        User {
            id,
            name: format!("User {id}"),
            email: email.to_string(),
            role: UserRole::User,
            category: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn test_config() -> NotificationConfig {
        NotificationConfig {
            sender_address: "noreply@campushub.example".to_string(),
            enabled: true,
        }
    }

    #[tokio::test]
    async fn test_batch_send_is_one_message_to_all_recipients() {
        let mailer = Box::new(test_support::RecordingMailer::default());
        let service = NotificationService::new(mailer, test_config());

        let recipients = vec![test_user(1, "a@campus.edu"), test_user(2, "b@campus.edu")];
        let mut params = HashMap::new();
        params.insert("event_title".to_string(), "Open Day".to_string());
        params.insert("event_date".to_string(), "2026-10-01 18:00 UTC".to_string());

        service
            .send_batch(&recipients, TemplateKind::EventAttendanceReminder, &params)
            .await
            .unwrap();

        let stats = service.stats();
        assert_eq!(stats.total_sent, 2);
        assert_eq!(stats.total_failed, 0);
        assert_eq!(
            stats.sent_by_template.get("event_attendance_reminder"),
            Some(&2)
        );
    }

    #[tokio::test]
    async fn test_mailer_failure_is_swallowed() {
        let mailer = Box::new(test_support::RecordingMailer {
            fail: true,
            ..Default::default()
        });
        let service = NotificationService::new(mailer, test_config());

        let recipients = vec![test_user(1, "a@campus.edu")];
        let result = service
            .send_batch(&recipients, TemplateKind::EventApproved, &HashMap::new())
            .await;

        assert!(result.is_ok());
        let stats = service.stats();
        assert_eq!(stats.total_sent, 0);
        assert_eq!(stats.total_failed, 1);
    }

    #[tokio::test]
    async fn test_empty_recipient_list_skips_send() {
        let service = NotificationService::new(Box::new(NoopMailer), test_config());
        service
            .send_batch(&[], TemplateKind::WaitlistPromoted, &HashMap::new())
            .await
            .unwrap();
        assert_eq!(service.stats().total_sent, 0);
    }

    #[test]
    fn test_template_substitution() {
        let service = NotificationService::new(Box::new(NoopMailer), test_config());
        let mut params = HashMap::new();
        params.insert("event_title".to_string(), "Hack Night".to_string());
        params.insert("approver_name".to_string(), "Dana".to_string());
        params.insert("event_date".to_string(), "tomorrow".to_string());

        let (subject, body) = service
            .format_message(TemplateKind::EventApproved, &params)
            .unwrap();
        assert!(subject.contains("Hack Night"));
        assert!(body.contains("Dana"));
        assert!(!body.contains("{event_title}"));
    }
}
