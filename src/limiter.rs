// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fixed-window submission rate limiter.
//!
//! `RateLimiter` binds a `RateLimitPolicy` to a shared `RateLimitStore`. It
//! keeps no state of its own: every decision is made by the store's atomic
//! check-and-increment, so any number of limiter handles (and processes) can
//! share one table.

use crate::config::RateLimitConfig;
use crate::metrics::Metrics;
use crate::store::{RateLimitStore, StoreResult};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Maximum events per identity within one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_events: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub const fn new(max_events: u32, window: Duration) -> Self {
        Self { max_events, window }
    }
}

impl Default for RateLimitPolicy {
    /// Five submissions per hour.
    fn default() -> Self {
        Self::new(5, Duration::from_secs(3600))
    }
}

impl From<&RateLimitConfig> for RateLimitPolicy {
    fn from(config: &RateLimitConfig) -> Self {
        Self::new(config.max_events, config.window_duration())
    }
}

/// Thread-safe rate limiter handle.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    policy: RateLimitPolicy,
}

impl RateLimiter {
    /// Create a new rate limiter over `store` enforcing `policy`.
    pub fn new(store: Arc<dyn RateLimitStore>, policy: RateLimitPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    /// Decide whether `identity` may perform one more event now.
    ///
    /// An `Err` means the decision could not be made; callers must not treat
    /// it as permission.
    pub async fn allow(&self, identity: &str) -> StoreResult<bool> {
        self.allow_at(identity, Utc::now()).await
    }

    /// `allow` against an explicit clock reading.
    pub async fn allow_at(&self, identity: &str, now: DateTime<Utc>) -> StoreResult<bool> {
        let allowed = self
            .store
            .check_and_increment(identity, self.policy.max_events, self.policy.window, now)
            .await?;
        debug!(identity, allowed, "Rate limit decision");
        Ok(allowed)
    }

    /// Remove records whose window has expired under this policy.
    pub async fn cleanup_expired(&self) -> StoreResult<u64> {
        self.cleanup_expired_at(Utc::now()).await
    }

    pub async fn cleanup_expired_at(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        self.store.cleanup_expired(self.policy.window, now).await
    }
}

/// Run `cleanup_expired` every `every` until the task is aborted.
///
/// A failed sweep is logged and retried on the next tick.
pub fn spawn_cleanup(limiter: RateLimiter, every: Duration, metrics: Metrics) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(?every, "Rate limit cleanup task started");
        loop {
            interval.tick().await;
            match limiter.cleanup_expired().await {
                Ok(removed) => {
                    metrics.record_cleanup(removed);
                    if removed > 0 {
                        info!(removed, "Expired rate limit records removed");
                    }
                }
                Err(e) => warn!(error = %e, "Rate limit cleanup failed"),
            }
        }
    })
}
