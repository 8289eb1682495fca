//! Space repository implementation

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use weld_core::{Result, Space, SpaceId, SpaceRepository, UserId, WeldError};

/// PostgreSQL implementation of SpaceRepository
pub struct PgSpaceRepository {
    pool: PgPool,
}

impl PgSpaceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Parse row into Space
    fn row_to_space(row: &sqlx::postgres::PgRow) -> Space {
        let member_ids: Vec<Uuid> = row.get("member_ids");

        Space {
            id: SpaceId::from_uuid(row.get("id")),
            name: row.get("name"),
            moderator_user_id: UserId::from_uuid(row.get("moderator_user_id")),
            member_ids: member_ids.into_iter().map(UserId::from_uuid).collect(),
            is_deleted: row.get("is_deleted"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }

    /// Member ids in a stable order for the array column
    fn member_array(member_ids: &HashSet<UserId>) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = member_ids.iter().map(|id| id.as_uuid()).collect();
        ids.sort();
        ids
    }
}

fn map_space_conflict(error: sqlx::Error, name: &str) -> WeldError {
    if let sqlx::Error::Database(database_error) = &error {
        if database_error.code().as_deref() == Some("23505") {
            return WeldError::conflict(format!("space name {:?} already exists", name));
        }
    }
    WeldError::persistence(error.to_string())
}

#[async_trait]
impl SpaceRepository for PgSpaceRepository {
    #[instrument(skip(self, space), fields(name = %space.name))]
    async fn add(&self, space: &Space) -> Result<Space> {
        sqlx::query(
            r#"
            INSERT INTO spaces (id, name, moderator_user_id, member_ids, is_deleted, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(space.id.as_uuid())
        .bind(&space.name)
        .bind(space.moderator_user_id.as_uuid())
        .bind(Self::member_array(&space.member_ids))
        .bind(space.is_deleted)
        .bind(space.created_at)
        .bind(space.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_space_conflict(e, &space.name))?;

        Ok(space.clone())
    }

    #[instrument(skip(self, space), fields(id = %space.id))]
    async fn update(&self, space: &Space) -> Result<Space> {
        let result = sqlx::query(
            r#"
            UPDATE spaces
            SET name = $1, moderator_user_id = $2, member_ids = $3, is_deleted = $4, updated_at = $5
            WHERE id = $6
            "#,
        )
        .bind(&space.name)
        .bind(space.moderator_user_id.as_uuid())
        .bind(Self::member_array(&space.member_ids))
        .bind(space.is_deleted)
        .bind(space.updated_at)
        .bind(space.id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_space_conflict(e, &space.name))?;

        if result.rows_affected() == 0 {
            return Err(WeldError::not_found("space", space.id.to_string()));
        }

        Ok(space.clone())
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: SpaceId) -> Result<Option<Space>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, moderator_user_id, member_ids, is_deleted, created_at, updated_at
            FROM spaces
            WHERE id = $1 AND NOT is_deleted
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WeldError::persistence(e.to_string()))?;

        Ok(row.as_ref().map(Self::row_to_space))
    }

    #[instrument(skip(self))]
    async fn get_by_name(&self, name: &str) -> Result<Option<Space>> {
        // Exact, case-sensitive match; deleted rows do not count.
        let row = sqlx::query(
            r#"
            SELECT id, name, moderator_user_id, member_ids, is_deleted, created_at, updated_at
            FROM spaces
            WHERE name = $1 AND NOT is_deleted
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WeldError::persistence(e.to_string()))?;

        Ok(row.as_ref().map(Self::row_to_space))
    }

    #[instrument(skip(self))]
    async fn soft_delete(&self, id: SpaceId) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE spaces
            SET is_deleted = TRUE, updated_at = $1
            WHERE id = $2 AND NOT is_deleted
            "#,
        )
        .bind(chrono::Utc::now())
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| WeldError::persistence(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(WeldError::not_found("space", id.to_string()));
        }

        Ok(())
    }
}
