//! Location repository implementation

use sqlx::PgPool;
use chrono::Utc;
use crate::models::location::{CreateLocationRequest, Location};
use crate::utils::errors::CampusHubError;

#[derive(Debug, Clone)]
pub struct LocationRepository {
    pool: PgPool,
}

impl LocationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new location
    pub async fn create(&self, request: CreateLocationRequest) -> Result<Location, CampusHubError> {
        let location = sqlx::query_as::<_, Location>(
            r#"
            INSERT INTO locations (name, capacity, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            RETURNING id, name, capacity, active, created_at, updated_at
            "#
        )
        .bind(request.name)
        .bind(request.capacity)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(location)
    }

    /// Find location by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Location>, CampusHubError> {
        let location = sqlx::query_as::<_, Location>(
            "SELECT id, name, capacity, active, created_at, updated_at FROM locations WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }

    /// List active locations
    pub async fn list_active(&self) -> Result<Vec<Location>, CampusHubError> {
        let locations = sqlx::query_as::<_, Location>(
            "SELECT id, name, capacity, active, created_at, updated_at FROM locations WHERE active = true ORDER BY name ASC"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(locations)
    }

    /// Deactivate a location so new events cannot reference it
    pub async fn set_active(&self, id: i64, active: bool) -> Result<Location, CampusHubError> {
        let location = sqlx::query_as::<_, Location>(
            r#"
            UPDATE locations
            SET active = $2, updated_at = $3
            WHERE id = $1
            RETURNING id, name, capacity, active, created_at, updated_at
            "#
        )
        .bind(id)
        .bind(active)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(location)
    }
}
