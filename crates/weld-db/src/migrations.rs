//! Embedded schema migrations
//!
//! Statements run in order at startup and every one is idempotent, so a
//! restarted server converges on the same schema without a separate
//! migration tool.

use sqlx::PgPool;
use tracing::info;

use weld_core::{Result, WeldError};

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        display_name TEXT,
        picture_url TEXT,
        status TEXT NOT NULL DEFAULT 'active',
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS spaces (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        moderator_user_id UUID NOT NULL,
        member_ids UUID[] NOT NULL DEFAULT '{}',
        is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    // Only live spaces compete for a name; soft-deleted rows keep
    // theirs so audit history stays intact.
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS spaces_name_live_idx
        ON spaces (name)
        WHERE NOT is_deleted
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS group_space_mappings (
        id UUID PRIMARY KEY,
        group_key TEXT NOT NULL,
        space_id UUID NOT NULL REFERENCES spaces (id),
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_by UUID NOT NULL,
        updated_by UUID,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    // No uniqueness on group_key: inactive history rows are retained,
    // and the single-active rule is owned by the services.
    r#"
    CREATE INDEX IF NOT EXISTS group_space_mappings_active_key_idx
        ON group_space_mappings (group_key)
        WHERE is_active
    "#,
];

/// Apply the embedded schema
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    info!("Running database migrations");

    for statement in MIGRATIONS {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| WeldError::persistence(format!("Migration failed: {}", e)))?;
    }

    info!("Database migrations complete");
    Ok(())
}
