//! Shared test infrastructure
//!
//! Integration tests need a PostgreSQL instance and are gated on
//! TEST_DATABASE_URL: when the variable is unset the tests return early
//! instead of failing, so the unit suite stays runnable anywhere.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::PgPool;

use campushub::config::Settings;
use campushub::models::{Actor, CreateEventRequest, CreateUserRequest, Event, User, UserRole};
use campushub::services::{EmailMessage, Mailer, ServiceFactory};
use campushub::utils::clock::SystemClock;
use campushub::utils::errors::Result;

/// Mailer that counts batch sends, for asserting delivery behavior.
#[derive(Default)]
pub struct CountingMailer {
    pub batches: Arc<AtomicUsize>,
    pub recipients: Arc<AtomicUsize>,
}

#[async_trait]
impl Mailer for CountingMailer {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.recipients.fetch_add(message.to.len(), Ordering::SeqCst);
        Ok(())
    }
}

pub struct TestApp {
    pub pool: PgPool,
    pub services: ServiceFactory,
    pub batches: Arc<AtomicUsize>,
    pub recipients: Arc<AtomicUsize>,
}

impl TestApp {
    /// Connect to the test database, run migrations and reset state.
    /// Returns None (test skipped) when TEST_DATABASE_URL is unset.
    pub async fn new() -> Option<Self> {
        let url = match std::env::var("TEST_DATABASE_URL") {
            Ok(url) => url,
            Err(_) => {
                eprintln!("TEST_DATABASE_URL not set, skipping integration test");
                return None;
            }
        };

        let pool = PgPool::connect(&url)
            .await
            .expect("Failed to connect to test database");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        sqlx::query(
            "TRUNCATE reminder_logs, event_approval_history, event_registrations, events, locations, users RESTART IDENTITY CASCADE"
        )
        .execute(&pool)
        .await
        .expect("Failed to reset test database");

        let batches = Arc::new(AtomicUsize::new(0));
        let recipients = Arc::new(AtomicUsize::new(0));
        let mailer = CountingMailer {
            batches: batches.clone(),
            recipients: recipients.clone(),
        };

        let services = ServiceFactory::new(
            pool.clone(),
            Settings::default(),
            Box::new(mailer),
            Arc::new(SystemClock),
        );

        Some(Self {
            pool,
            services,
            batches,
            recipients,
        })
    }

    pub async fn create_user(&self, name: &str, role: UserRole) -> User {
        self.create_user_with_category(name, role, None).await
    }

    pub async fn create_user_with_category(
        &self,
        name: &str,
        role: UserRole,
        category: Option<&str>,
    ) -> User {
        self.services
            .database()
            .users
            .create(CreateUserRequest {
                name: name.to_string(),
                email: format!("{}@campus.edu", name.to_lowercase().replace(' ', ".")),
                role,
                category: category.map(str::to_string),
            })
            .await
            .expect("Failed to create user")
    }

    /// A published event two days out with an open registration window.
    pub async fn create_published_event(
        &self,
        staff: &User,
        max_attendees: Option<i32>,
    ) -> Event {
        let event_at = Utc::now() + Duration::days(2);
        self.create_published_event_at(staff, max_attendees, event_at).await
    }

    pub async fn create_published_event_at(
        &self,
        staff: &User,
        max_attendees: Option<i32>,
        event_at: chrono::DateTime<Utc>,
    ) -> Event {
        let actor = Actor::new(staff.id, staff.role);
        self.services
            .events
            .create_event(
                CreateEventRequest {
                    title: "Test Event".to_string(),
                    description: Some("Integration test event".to_string()),
                    event_at,
                    registration_starts_at: Utc::now() - Duration::hours(1),
                    registration_ends_at: event_at - Duration::hours(1),
                    location_id: None,
                    max_attendees,
                    allowed_categories: None,
                    publish_immediately: true,
                },
                &actor,
            )
            .await
            .expect("Failed to create published event")
    }

    /// A draft event owned by the given user.
    pub async fn create_draft_event(&self, creator: &User) -> Event {
        let actor = Actor::new(creator.id, creator.role);
        let event_at = Utc::now() + Duration::days(7);
        self.services
            .events
            .create_event(
                CreateEventRequest {
                    title: "Draft Event".to_string(),
                    description: None,
                    event_at,
                    registration_starts_at: Utc::now() + Duration::hours(1),
                    registration_ends_at: event_at - Duration::hours(1),
                    location_id: None,
                    max_attendees: None,
                    allowed_categories: None,
                    publish_immediately: false,
                },
                &actor,
            )
            .await
            .expect("Failed to create draft event")
    }
}

pub fn actor(user: &User) -> Actor {
    Actor::new(user.id, user.role)
}
