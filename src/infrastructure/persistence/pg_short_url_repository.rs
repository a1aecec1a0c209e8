//! PostgreSQL implementation of the short URL repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{InsertOutcome, NewShortUrl, ShortUrl};
use crate::domain::repositories::ShortUrlRepository;
use crate::error::AppError;
use crate::utils::db_error::is_unique_violation;

const SHORT_URL_COLUMNS: &str =
    "slug, long_url, is_custom, owner_id, created_at, updated_at, expires_at";

/// PostgreSQL repository for slug mappings.
///
/// Slug uniqueness is the primary key; inserts use `ON CONFLICT DO NOTHING`
/// so a collision is reported as [`InsertOutcome::SlugTaken`] in one round trip.
pub struct PgShortUrlRepository {
    pool: Arc<PgPool>,
}

impl PgShortUrlRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShortUrlRepository for PgShortUrlRepository {
    async fn insert(&self, new_url: NewShortUrl) -> Result<InsertOutcome, AppError> {
        let sql = format!(
            r#"
            INSERT INTO short_urls (slug, long_url, is_custom, owner_id, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (slug) DO NOTHING
            RETURNING {SHORT_URL_COLUMNS}
            "#
        );

        let inserted = sqlx::query_as::<_, ShortUrl>(&sql)
            .bind(&new_url.slug)
            .bind(&new_url.long_url)
            .bind(new_url.is_custom)
            .bind(new_url.owner_id)
            .bind(new_url.expires_at)
            .fetch_optional(self.pool.as_ref())
            .await;

        match inserted {
            Ok(Some(url)) => Ok(InsertOutcome::Inserted(url)),
            Ok(None) => Ok(InsertOutcome::SlugTaken),
            Err(e) if is_unique_violation(&e, Some("short_urls_pkey")) => {
                Ok(InsertOutcome::SlugTaken)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<ShortUrl>, AppError> {
        let sql = format!("SELECT {SHORT_URL_COLUMNS} FROM short_urls WHERE slug = $1");

        let row = sqlx::query_as::<_, ShortUrl>(&sql)
            .bind(slug)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row)
    }

    async fn find_active_by_long_url(
        &self,
        long_url: &str,
        owner_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<Option<ShortUrl>, AppError> {
        let sql = format!(
            r#"
            SELECT {SHORT_URL_COLUMNS}
            FROM short_urls
            WHERE long_url = $1
              AND owner_id IS NOT DISTINCT FROM $2
              AND (expires_at IS NULL OR expires_at > $3)
            ORDER BY created_at DESC
            LIMIT 1
            "#
        );

        let row = sqlx::query_as::<_, ShortUrl>(&sql)
            .bind(long_url)
            .bind(owner_id)
            .bind(now)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row)
    }

    async fn delete(&self, slug: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM short_urls WHERE slug = $1")
            .bind(slug)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_page(&self, offset: i64, limit: i64) -> Result<Vec<ShortUrl>, AppError> {
        let sql = format!(
            r#"
            SELECT {SHORT_URL_COLUMNS}
            FROM short_urls
            ORDER BY created_at DESC, slug DESC
            LIMIT $1 OFFSET $2
            "#
        );

        let rows = sqlx::query_as::<_, ShortUrl>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(rows)
    }

    async fn count(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM short_urls")
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count)
    }

    async fn delete_expired(&self, before: DateTime<Utc>) -> Result<Vec<String>, AppError> {
        let slugs: Vec<String> =
            sqlx::query_scalar("DELETE FROM short_urls WHERE expires_at < $1 RETURNING slug")
                .bind(before)
                .fetch_all(self.pool.as_ref())
                .await?;

        Ok(slugs)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }
}
