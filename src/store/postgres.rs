// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Postgres-backed stores.

use super::{
    expiry_cutoff, NewPost, Post, PostStore, RateLimitRecord, RateLimitStore, StoreResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info};

/// Open a connection pool and apply the embedded migrations.
pub async fn connect(database_url: &str) -> StoreResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied");

    Ok(pool)
}

/// Rate limit counters in the `rate_limits` table.
#[derive(Clone)]
pub struct PgRateLimitStore {
    pool: PgPool,
}

impl PgRateLimitStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RateLimitStore for PgRateLimitStore {
    async fn check_and_increment(
        &self,
        identity: &str,
        max_events: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        // A racing first insert blocks here until the winner commits, then
        // falls through to the locked read below.
        let inserted = sqlx::query(
            "INSERT INTO rate_limits (identity, event_count, window_start) \
             VALUES ($1, 1, $2) ON CONFLICT (identity) DO NOTHING",
        )
        .bind(identity)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 1 {
            tx.commit().await?;
            return Ok(true);
        }

        let row: Option<(i32, DateTime<Utc>)> = sqlx::query_as(
            "SELECT event_count, window_start FROM rate_limits WHERE identity = $1 FOR UPDATE",
        )
        .bind(identity)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((count, window_start)) = row else {
            // Swept between the insert attempt and the locked read.
            sqlx::query(
                "INSERT INTO rate_limits (identity, event_count, window_start) VALUES ($1, 1, $2) \
                 ON CONFLICT (identity) DO UPDATE SET event_count = 1, window_start = EXCLUDED.window_start",
            )
            .bind(identity)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            return Ok(true);
        };

        let record = RateLimitRecord {
            identity: identity.to_string(),
            count: u32::try_from(count).unwrap_or(0),
            window_start,
        };

        if record.is_expired(window, now) {
            debug!(identity, stale_count = record.count, "Window expired, resetting");
            sqlx::query(
                "UPDATE rate_limits SET event_count = 1, window_start = $2 WHERE identity = $1",
            )
            .bind(identity)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            return Ok(true);
        }

        if record.count >= max_events {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE rate_limits SET event_count = event_count + 1 WHERE identity = $1")
            .bind(identity)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(true)
    }

    async fn cleanup_expired(&self, window: Duration, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM rate_limits WHERE window_start < $1")
            .bind(expiry_cutoff(window, now))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn record(&self, identity: &str) -> StoreResult<Option<RateLimitRecord>> {
        let row: Option<(String, i32, DateTime<Utc>)> = sqlx::query_as(
            "SELECT identity, event_count, window_start FROM rate_limits WHERE identity = $1",
        )
        .bind(identity)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(identity, count, window_start)| RateLimitRecord {
            identity,
            count: u32::try_from(count).unwrap_or(0),
            window_start,
        }))
    }
}

/// Blog posts in the `blog_posts` table.
#[derive(Clone)]
pub struct PgPostStore {
    pool: PgPool,
}

impl PgPostStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostStore for PgPostStore {
    async fn create(&self, post: NewPost, now: DateTime<Utc>) -> StoreResult<Post> {
        let stored = sqlx::query_as::<_, Post>(
            "INSERT INTO blog_posts (title, content, country, created_at) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, title, content, country, created_at",
        )
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.country)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    async fn random(&self, limit: i64, offset: i64) -> StoreResult<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            "SELECT id, title, content, country, created_at FROM blog_posts \
             ORDER BY RANDOM() LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    async fn list(&self, limit: i64, offset: i64) -> StoreResult<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            "SELECT id, title, content, country, created_at FROM blog_posts \
             ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    async fn count(&self) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM blog_posts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
