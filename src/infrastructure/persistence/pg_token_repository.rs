//! PostgreSQL implementation of token repository.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::repositories::{ApiToken, TokenRepository};
use crate::error::AppError;

const TOKEN_COLUMNS: &str = "id, name, token_hash, is_admin, created_at, last_used_at, revoked_at";

/// PostgreSQL repository for API token storage and validation.
///
/// Stores HMAC hashes only. Raw tokens are never persisted.
pub struct PgTokenRepository {
    pool: Arc<PgPool>,
}

impl PgTokenRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRepository for PgTokenRepository {
    async fn find_active_by_hash(&self, token_hash: &str) -> Result<Option<ApiToken>, AppError> {
        let sql = format!(
            "SELECT {TOKEN_COLUMNS} FROM api_tokens WHERE token_hash = $1 AND revoked_at IS NULL"
        );

        let row = sqlx::query_as::<_, ApiToken>(&sql)
            .bind(token_hash)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row)
    }

    async fn update_last_used(&self, token_id: i64) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE api_tokens
            SET last_used_at = NOW()
            WHERE id = $1
              AND revoked_at IS NULL
            "#,
        )
        .bind(token_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn create_token(
        &self,
        name: &str,
        token_hash: &str,
        is_admin: bool,
    ) -> Result<ApiToken, AppError> {
        let sql = format!(
            r#"
            INSERT INTO api_tokens (name, token_hash, is_admin)
            VALUES ($1, $2, $3)
            RETURNING {TOKEN_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, ApiToken>(&sql)
            .bind(name)
            .bind(token_hash)
            .bind(is_admin)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(row)
    }

    async fn list_tokens(&self) -> Result<Vec<ApiToken>, AppError> {
        let sql = format!("SELECT {TOKEN_COLUMNS} FROM api_tokens ORDER BY created_at DESC");

        let rows = sqlx::query_as::<_, ApiToken>(&sql)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(rows)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ApiToken>, AppError> {
        let sql = format!("SELECT {TOKEN_COLUMNS} FROM api_tokens WHERE id = $1");

        let row = sqlx::query_as::<_, ApiToken>(&sql)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<ApiToken>, AppError> {
        let sql = format!("SELECT {TOKEN_COLUMNS} FROM api_tokens WHERE name = $1");

        let row = sqlx::query_as::<_, ApiToken>(&sql)
            .bind(name)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row)
    }

    async fn revoke_token(&self, id: i64) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE api_tokens
            SET revoked_at = NOW()
            WHERE id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }
}
