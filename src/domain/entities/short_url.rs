//! Short URL entity: one slug mapped to one target.

use chrono::{DateTime, Utc};

/// A slug → target mapping.
///
/// `slug` is immutable after creation. An expired mapping is still a valid row
/// (it shows up in listings) until the cleanup job removes it, but it is never
/// redirectable.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ShortUrl {
    pub slug: String,
    pub long_url: String,
    pub is_custom: bool,
    pub owner_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ShortUrl {
    /// Returns `true` if the mapping has an expiry at or before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        is_expired(self.expires_at, now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Expiry check shared by stored rows and cached entries.
pub fn is_expired(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires_at.is_some_and(|at| at <= now)
}

/// Input for inserting a new mapping. Timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewShortUrl {
    pub slug: String,
    pub long_url: String,
    pub is_custom: bool,
    pub owner_id: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Result of an insert attempt.
///
/// A slug collision is an expected outcome, not an error: the generated-slug
/// loop retries on it and custom claims surface it to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(ShortUrl),
    SlugTaken,
}

/// One page of an ordered listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, page: u32, limit: u32) -> Self {
        let pages = if total <= 0 || limit == 0 {
            0
        } else {
            (total as u64).div_ceil(limit as u64) as u32
        };

        Self {
            items,
            total,
            page,
            limit,
            pages,
        }
    }
}
