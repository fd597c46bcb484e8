// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Persistence for rate limit counters and blog posts.
//!
//! Two backends implement the same traits:
//! 1. `postgres` - the production store, one transaction per check
//! 2. `memory` - an in-process store used by tests and `DATABASE_URL=memory`

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub use memory::{MemoryPostStore, MemoryRateLimitStore};
pub use postgres::{PgPostStore, PgRateLimitStore};

/// Persistence-layer failure. Never a policy outcome.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Counter state for one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRecord {
    pub identity: String,
    pub count: u32,
    pub window_start: DateTime<Utc>,
}

impl RateLimitRecord {
    pub fn fresh(identity: &str, now: DateTime<Utc>) -> Self {
        Self {
            identity: identity.to_string(),
            count: 1,
            window_start: now,
        }
    }

    /// A window is expired once strictly more than `window` has elapsed.
    pub fn is_expired(&self, window: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.window_start) > to_chrono(window)
    }
}

/// Persisted per-identity counters with an atomic check-and-increment.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Decide and record one event for `identity`, as a single atomic unit.
    ///
    /// - no record: insert `count = 1, window_start = now`, allow
    /// - expired window: reset to `count = 1, window_start = now`, allow
    /// - `count >= max_events`: deny, state untouched
    /// - otherwise: increment, allow
    async fn check_and_increment(
        &self,
        identity: &str,
        max_events: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Delete every record whose window started before `now - window`.
    /// Returns how many records were removed.
    async fn cleanup_expired(&self, window: Duration, now: DateTime<Utc>) -> StoreResult<u64>;

    /// Current record for `identity`, if any.
    async fn record(&self, identity: &str) -> StoreResult<Option<RateLimitRecord>>;
}

/// A stored blog post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub country: String,
    pub created_at: DateTime<Utc>,
}

/// A post that has passed validation but is not yet stored.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub country: String,
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn create(&self, post: NewPost, now: DateTime<Utc>) -> StoreResult<Post>;

    /// Posts in random order.
    async fn random(&self, limit: i64, offset: i64) -> StoreResult<Vec<Post>>;

    /// Posts newest first.
    async fn list(&self, limit: i64, offset: i64) -> StoreResult<Vec<Post>>;

    async fn count(&self) -> StoreResult<i64>;

    /// Returns false when no post had that id.
    async fn delete(&self, id: i64) -> StoreResult<bool>;
}

pub(crate) fn to_chrono(window: Duration) -> chrono::Duration {
    chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX)
}

/// Start of the oldest window still considered live at `now`.
pub(crate) fn expiry_cutoff(window: Duration, now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_sub_signed(to_chrono(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
