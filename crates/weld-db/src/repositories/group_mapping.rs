//! Group mapping repository implementation

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use weld_core::{
    GroupMappingId, GroupMappingRepository, GroupSpaceMapping, Result, SpaceId, UserId, WeldError,
};

/// PostgreSQL implementation of GroupMappingRepository
pub struct PgGroupMappingRepository {
    pool: PgPool,
}

impl PgGroupMappingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Parse row into GroupSpaceMapping
    fn row_to_mapping(row: &sqlx::postgres::PgRow) -> GroupSpaceMapping {
        let updated_by: Option<Uuid> = row.get("updated_by");

        GroupSpaceMapping {
            id: GroupMappingId::from_uuid(row.get("id")),
            group_key: row.get("group_key"),
            space_id: SpaceId::from_uuid(row.get("space_id")),
            is_active: row.get("is_active"),
            created_by: UserId::from_uuid(row.get("created_by")),
            updated_by: updated_by.map(UserId::from_uuid),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl GroupMappingRepository for PgGroupMappingRepository {
    #[instrument(skip(self))]
    async fn get_all(&self) -> Result<Vec<GroupSpaceMapping>> {
        let rows = sqlx::query(
            r#"
            SELECT id, group_key, space_id, is_active, created_by, updated_by, created_at, updated_at
            FROM group_space_mappings
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| WeldError::persistence(e.to_string()))?;

        Ok(rows.iter().map(Self::row_to_mapping).collect())
    }

    #[instrument(skip(self))]
    async fn get_active_by_group_key(&self, group_key: &str) -> Result<Option<GroupSpaceMapping>> {
        let row = sqlx::query(
            r#"
            SELECT id, group_key, space_id, is_active, created_by, updated_by, created_at, updated_at
            FROM group_space_mappings
            WHERE group_key = $1 AND is_active
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(group_key.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WeldError::persistence(e.to_string()))?;

        Ok(row.as_ref().map(Self::row_to_mapping))
    }

    #[instrument(skip(self), fields(key_count = group_keys.len()))]
    async fn get_space_ids_by_group_keys(&self, group_keys: &[String]) -> Result<Vec<SpaceId>> {
        let trimmed: Vec<String> = group_keys
            .iter()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .collect();

        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT DISTINCT space_id
            FROM group_space_mappings
            WHERE is_active AND group_key = ANY($1)
            "#,
        )
        .bind(&trimmed)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| WeldError::persistence(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|row| SpaceId::from_uuid(row.get("space_id")))
            .collect())
    }

    #[instrument(skip(self))]
    async fn add(
        &self,
        actor_user_id: UserId,
        group_key: &str,
        space_id: SpaceId,
    ) -> Result<GroupSpaceMapping> {
        let mapping = GroupSpaceMapping::new(actor_user_id, group_key.trim(), space_id);

        sqlx::query(
            r#"
            INSERT INTO group_space_mappings
                (id, group_key, space_id, is_active, created_by, updated_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(mapping.id.as_uuid())
        .bind(&mapping.group_key)
        .bind(mapping.space_id.as_uuid())
        .bind(mapping.is_active)
        .bind(mapping.created_by.as_uuid())
        .bind(mapping.updated_by.map(|id| id.as_uuid()))
        .bind(mapping.created_at)
        .bind(mapping.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| WeldError::persistence(e.to_string()))?;

        Ok(mapping)
    }

    #[instrument(skip(self))]
    async fn deactivate(&self, actor_user_id: UserId, id: GroupMappingId) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE group_space_mappings
            SET is_active = FALSE, updated_by = $1, updated_at = $2
            WHERE id = $3
            "#,
        )
        .bind(actor_user_id.as_uuid())
        .bind(chrono::Utc::now())
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| WeldError::persistence(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(WeldError::not_found("group mapping", id.to_string()));
        }

        Ok(())
    }
}
