// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Ghost Blog
//!
//! An anonymous blog submission service. Visitors submit short posts and read
//! random ones; an administrator reviews and deletes them.
//!
//! - Per-IP submission limit (5 posts per hour by default), enforced by an
//!   atomic check-and-increment against a persisted counter
//! - Periodic sweep of expired rate limit records
//! - Country tagging of new posts via an ip-api.com compatible service
//! - HTTP Basic gate on the admin routes

pub mod app;
pub mod config;
pub mod error;
pub mod geo;
pub mod handlers;
pub mod identity;
pub mod limiter;
pub mod metrics;
pub mod middleware;
pub mod store;
pub mod validator;

pub use config::Config;
pub use limiter::{RateLimitPolicy, RateLimiter};
pub use store::{RateLimitRecord, RateLimitStore, StoreError};
