//! User repository implementation

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;

use weld_core::{Result, User, UserId, UserRepository, UserStatus, WeldError};

/// PostgreSQL implementation of UserRepository
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Parse row into User
    fn row_to_user(row: &sqlx::postgres::PgRow) -> User {
        let status: String = row.get("status");

        User {
            id: UserId::from_uuid(row.get("id")),
            email: row.get("email"),
            display_name: row.get("display_name"),
            picture_url: row.get("picture_url"),
            status: match status.as_str() {
                "invited" => UserStatus::Invited,
                _ => UserStatus::Active,
            },
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }

    fn status_str(status: UserStatus) -> &'static str {
        match status {
            UserStatus::Active => "active",
            UserStatus::Invited => "invited",
        }
    }
}

fn map_email_conflict(error: sqlx::Error, email: &str) -> WeldError {
    if let sqlx::Error::Database(database_error) = &error {
        if database_error.code().as_deref() == Some("23505") {
            return WeldError::conflict(format!("user with email {:?} already exists", email));
        }
    }
    WeldError::persistence(error.to_string())
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip(self))]
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, display_name, picture_url, status, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WeldError::persistence(e.to_string()))?;

        Ok(row.as_ref().map(Self::row_to_user))
    }

    #[instrument(skip(self))]
    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, display_name, picture_url, status, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WeldError::persistence(e.to_string()))?;

        Ok(row.as_ref().map(Self::row_to_user))
    }

    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn add(&self, user: &User) -> Result<User> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, display_name, picture_url, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.picture_url)
        .bind(Self::status_str(user.status))
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_email_conflict(e, &user.email))?;

        Ok(user.clone())
    }

    #[instrument(skip(self, user), fields(id = %user.id))]
    async fn update(&self, user: &User) -> Result<User> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $1, display_name = $2, picture_url = $3, status = $4, updated_at = $5
            WHERE id = $6
            "#,
        )
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.picture_url)
        .bind(Self::status_str(user.status))
        .bind(user.updated_at)
        .bind(user.id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_email_conflict(e, &user.email))?;

        if result.rows_affected() == 0 {
            return Err(WeldError::not_found("user", user.id.to_string()));
        }

        Ok(user.clone())
    }
}
