//! PostgreSQL implementation of the click repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{Click, ClickStats, NewClick};
use crate::domain::repositories::ClickRepository;
use crate::error::AppError;
use crate::utils::db_error::is_foreign_key_violation;

/// PostgreSQL repository for click rows and their aggregates.
pub struct PgClickRepository {
    pool: Arc<PgPool>,
}

impl PgClickRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClickRepository for PgClickRepository {
    async fn insert_click(&self, click: NewClick) -> Result<Click, AppError> {
        let slug = click.slug.clone();

        let inserted = sqlx::query_as::<_, Click>(
            r#"
            INSERT INTO clicks (
                slug, clicked_at, ip_address, user_agent, referer,
                country, city, browser, os, device
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, slug, clicked_at, ip_address, user_agent, referer,
                      country, city, browser, os, device
            "#,
        )
        .bind(click.slug)
        .bind(click.clicked_at)
        .bind(click.ip_address)
        .bind(click.user_agent)
        .bind(click.referer)
        .bind(click.enrichment.country)
        .bind(click.enrichment.city)
        .bind(click.enrichment.browser)
        .bind(click.enrichment.os)
        .bind(click.enrichment.device)
        .fetch_one(self.pool.as_ref())
        .await;

        match inserted {
            Ok(row) => Ok(row),
            Err(e) if is_foreign_key_violation(&e) => Err(AppError::not_found(
                "Short URL no longer exists",
                json!({ "slug": slug }),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn aggregate_stats(&self, slug: &str) -> Result<ClickStats, AppError> {
        let (total_clicks, last_click, unique_ips): (i64, Option<DateTime<Utc>>, i64) =
            sqlx::query_as(
                r#"
                SELECT COUNT(*), MAX(clicked_at), COUNT(DISTINCT ip_address)
                FROM clicks
                WHERE slug = $1
                "#,
            )
            .bind(slug)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(ClickStats {
            total_clicks,
            last_click,
            unique_ips,
        })
    }
}
