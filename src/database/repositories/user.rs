//! User repository implementation

use sqlx::PgPool;
use chrono::Utc;
use crate::models::user::{CreateUserRequest, User};
use crate::utils::errors::CampusHubError;

const USER_COLUMNS: &str = "id, name, email, role, category, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user
    pub async fn create(&self, request: CreateUserRequest) -> Result<User, CampusHubError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, role, category, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id, name, email, role, category, created_at, updated_at
            "#
        )
        .bind(request.name)
        .bind(request.email)
        .bind(request.role)
        .bind(request.category)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, CampusHubError> {
        let user = sqlx::query_as::<_, User>(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1")
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// List users with pagination
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, CampusHubError> {
        let users = sqlx::query_as::<_, User>(
            &format!("SELECT {USER_COLUMNS} FROM users ORDER BY id ASC LIMIT $1 OFFSET $2")
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Users holding a registered (not waitlisted) seat for an event
    pub async fn find_registered_for_event(&self, event_id: i64) -> Result<Vec<User>, CampusHubError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.name, u.email, u.role, u.category, u.created_at, u.updated_at
            FROM users u
            INNER JOIN event_registrations r ON r.user_id = u.id
            WHERE r.event_id = $1 AND r.status = 'registered'
            ORDER BY r.registered_at ASC
            "#
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Users with no active (registered or waitlisted) registration for
    /// an event; the recipient set of the registration-deadline reminder.
    pub async fn find_without_active_registration(&self, event_id: i64) -> Result<Vec<User>, CampusHubError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.name, u.email, u.role, u.category, u.created_at, u.updated_at
            FROM users u
            WHERE NOT EXISTS (
                SELECT 1 FROM event_registrations r
                WHERE r.event_id = $1
                  AND r.user_id = u.id
                  AND r.status IN ('registered', 'waitlisted')
            )
            ORDER BY u.id ASC
            "#
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Count total users
    pub async fn count(&self) -> Result<i64, CampusHubError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
