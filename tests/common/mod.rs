// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Shared fixtures for the HTTP integration tests.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use ghost_blog::{
    app,
    config::Config,
    geo::StaticLocator,
    handlers::AppState,
    limiter::{RateLimitPolicy, RateLimiter},
    metrics::Metrics,
    store::{MemoryPostStore, MemoryRateLimitStore, PostStore, RateLimitStore},
    validator::PostValidator,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const ADMIN_PASSWORD: &str = "test-secret";
pub const COUNTRY: &str = "Norway";

pub struct TestApp {
    pub state: Arc<AppState>,
    pub rate_limits: Arc<dyn RateLimitStore>,
    pub posts: Arc<dyn PostStore>,
    router: Router,
}

impl TestApp {
    pub fn new(max_events: u32) -> Self {
        Self::with_rate_limit_store(Arc::new(MemoryRateLimitStore::new()), max_events)
    }

    pub fn with_rate_limit_store(rate_limits: Arc<dyn RateLimitStore>, max_events: u32) -> Self {
        let posts: Arc<dyn PostStore> = Arc::new(MemoryPostStore::new());
        let config = Config {
            admin_password: ADMIN_PASSWORD.to_string(),
            database_url: "memory".to_string(),
            ..Default::default()
        };

        let state = Arc::new(AppState {
            limiter: RateLimiter::new(
                rate_limits.clone(),
                RateLimitPolicy::new(max_events, Duration::from_secs(3600)),
            ),
            posts: posts.clone(),
            geo: Arc::new(StaticLocator::new(COUNTRY)),
            validator: PostValidator::default(),
            metrics: Metrics::new().unwrap(),
            config,
        });

        Self {
            router: app::router(state.clone()),
            state,
            rate_limits,
            posts,
        }
    }

    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn submit(&self, ip: &str, body: serde_json::Value) -> Response<Body> {
        let request = Request::post("/api/posts")
            .header("Content-Type", "application/json")
            .header("X-Forwarded-For", ip)
            .body(Body::from(body.to_string()))
            .unwrap();
        self.oneshot(request).await
    }
}

pub fn post_body(title: &str) -> serde_json::Value {
    serde_json::json!({ "title": title, "content": "Hello from the internet" })
}

pub fn admin_auth(password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("admin:{password}")))
}

pub async fn body_to_json(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_to_string(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
