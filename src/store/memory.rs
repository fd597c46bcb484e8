// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! In-process stores.
//!
//! The rate limit map relies on the `DashMap` entry API: the entry guard
//! holds the shard lock for the whole read-modify-write, so two checks for the
//! same identity are serialised while other shards stay available.

use super::{
    expiry_cutoff, NewPost, Post, PostStore, RateLimitRecord, RateLimitStore, StoreResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Rate limit counters held in memory.
#[derive(Debug, Default)]
pub struct MemoryRateLimitStore {
    records: DashMap<String, RateLimitRecord>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identities currently tracked.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn check_and_increment(
        &self,
        identity: &str,
        max_events: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        match self.records.entry(identity.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(RateLimitRecord::fresh(identity, now));
                Ok(true)
            }
            Entry::Occupied(mut slot) => {
                let record = slot.get_mut();
                if record.is_expired(window, now) {
                    debug!(identity, stale_count = record.count, "Window expired, resetting");
                    record.count = 1;
                    record.window_start = now;
                    return Ok(true);
                }
                if record.count >= max_events {
                    return Ok(false);
                }
                record.count += 1;
                Ok(true)
            }
        }
    }

    async fn cleanup_expired(&self, window: Duration, now: DateTime<Utc>) -> StoreResult<u64> {
        let cutoff = expiry_cutoff(window, now);
        let mut removed = 0u64;
        self.records.retain(|_, record| {
            let live = record.window_start >= cutoff;
            if !live {
                removed += 1;
            }
            live
        });
        Ok(removed)
    }

    async fn record(&self, identity: &str) -> StoreResult<Option<RateLimitRecord>> {
        Ok(self.records.get(identity).map(|r| r.value().clone()))
    }
}

/// Posts held in memory, keyed by id.
#[derive(Debug, Default)]
pub struct MemoryPostStore {
    posts: RwLock<BTreeMap<i64, Post>>,
    last_id: AtomicI64,
}

impl MemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn page(posts: Vec<Post>, limit: i64, offset: i64) -> Vec<Post> {
    posts
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn create(&self, post: NewPost, now: DateTime<Utc>) -> StoreResult<Post> {
        let id = self.last_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut posts = self.posts.write().await;
        let stored = Post {
            id,
            title: post.title,
            content: post.content,
            country: post.country,
            created_at: now,
        };
        posts.insert(id, stored.clone());
        Ok(stored)
    }

    async fn random(&self, limit: i64, offset: i64) -> StoreResult<Vec<Post>> {
        let mut all: Vec<Post> = self.posts.read().await.values().cloned().collect();
        all.shuffle(&mut rand::thread_rng());
        Ok(page(all, limit, offset))
    }

    async fn list(&self, limit: i64, offset: i64) -> StoreResult<Vec<Post>> {
        let mut all: Vec<Post> = self.posts.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(page(all, limit, offset))
    }

    async fn count(&self) -> StoreResult<i64> {
        Ok(self.posts.read().await.len() as i64)
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        Ok(self.posts.write().await.remove(&id).is_some())
    }
}
