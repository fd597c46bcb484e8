// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP integration tests for the post routes and their gates.

mod common;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::{DateTime, Utc};
use common::{admin_auth, body_to_json, body_to_string, post_body, TestApp, ADMIN_PASSWORD, COUNTRY};
use ghost_blog::metrics::Outcome;
use ghost_blog::store::{RateLimitRecord, RateLimitStore, StoreError};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Submission gate
// ============================================================================

#[tokio::test]
async fn test_submission_created_with_country() {
    let app = TestApp::new(5);

    let resp = app.submit("203.0.113.7", post_body("First")).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let json = body_to_json(resp).await;
    assert_eq!(json["title"], "First");
    assert_eq!(json["country"], COUNTRY);
    assert!(json["id"].is_number());
    assert!(json["created_at"].is_string());

    let record = app.rate_limits.record("203.0.113.7").await.unwrap().unwrap();
    assert_eq!(record.count, 1);
}

#[tokio::test]
async fn test_sixth_submission_is_rate_limited() {
    let app = TestApp::new(5);

    for i in 0..5 {
        let resp = app.submit("198.51.100.9", post_body(&format!("post {i}"))).await;
        assert_eq!(resp.status(), StatusCode::CREATED, "submission {} should pass", i + 1);
    }

    let resp = app.submit("198.51.100.9", post_body("one too many")).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(resp.headers()[header::RETRY_AFTER], "3600");
    let json = body_to_json(resp).await;
    assert_eq!(json["error"], "Rate limit exceeded. Maximum 5 posts per hour.");

    assert_eq!(app.posts.count().await.unwrap(), 5);
    assert_eq!(app.state.metrics.decisions(Outcome::Allowed), 5);
    assert_eq!(app.state.metrics.decisions(Outcome::Denied), 1);

    // Another client is unaffected.
    let resp = app.submit("198.51.100.10", post_body("neighbour")).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_rejected_submission_still_counts_against_limit() {
    let app = TestApp::new(1);

    let resp = app
        .submit("192.0.2.1", serde_json::json!({ "title": "", "content": "x" }))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app.submit("192.0.2.1", post_body("valid")).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
}

struct BrokenStore;

#[async_trait]
impl RateLimitStore for BrokenStore {
    async fn check_and_increment(
        &self,
        _identity: &str,
        _max_events: u32,
        _window: Duration,
        _now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn cleanup_expired(&self, _window: Duration, _now: DateTime<Utc>) -> Result<u64, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn record(&self, _identity: &str) -> Result<Option<RateLimitRecord>, StoreError> {
        Ok(None)
    }
}

#[tokio::test]
async fn test_store_failure_fails_closed() {
    let app = TestApp::with_rate_limit_store(Arc::new(BrokenStore), 5);

    let resp = app.submit("203.0.113.1", post_body("blocked")).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_to_json(resp).await;
    assert_eq!(json["error"], "Internal server error");

    assert_eq!(app.posts.count().await.unwrap(), 0);
    assert_eq!(app.state.metrics.decisions(Outcome::Error), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_admit_exactly_limit() {
    let app = Arc::new(TestApp::new(3));

    let tasks: Vec<_> = (0..12)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                app.submit("203.0.113.99", post_body(&format!("race {i}")))
                    .await
                    .status()
            })
        })
        .collect();

    let mut created = 0;
    let mut limited = 0;
    for task in tasks {
        match task.await.unwrap() {
            StatusCode::CREATED => created += 1,
            StatusCode::TOO_MANY_REQUESTS => limited += 1,
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(created, 3);
    assert_eq!(limited, 9);
    let record = app.rate_limits.record("203.0.113.99").await.unwrap().unwrap();
    assert_eq!(record.count, 3);
}

// ============================================================================
// Post validation
// ============================================================================

#[tokio::test]
async fn test_malformed_body_rejected() {
    let app = TestApp::new(5);
    let req = Request::post("/api/posts")
        .header("Content-Type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let resp = app.oneshot(req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_to_json(resp).await["error"], "Invalid request body");
}

#[tokio::test]
async fn test_missing_and_oversized_fields_rejected() {
    let app = TestApp::new(10);

    let resp = app
        .submit("192.0.2.5", serde_json::json!({ "title": "only a title" }))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_to_json(resp).await["error"], "Title and content are required");

    let resp = app.submit("192.0.2.5", post_body(&"t".repeat(256))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_to_json(resp).await["error"],
        "Title must be less than 255 characters"
    );
}

// ============================================================================
// Public reads
// ============================================================================

#[tokio::test]
async fn test_health() {
    let app = TestApp::new(5);
    let resp = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_to_string(resp).await, "OK");
}

#[tokio::test]
async fn test_random_posts_respects_limit() {
    let app = TestApp::new(50);
    for i in 0..25 {
        app.submit(&format!("192.0.2.{i}"), post_body(&format!("p{i}"))).await;
    }

    let resp = app
        .oneshot(Request::get("/api/posts").body(Body::empty()).unwrap())
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_to_json(resp).await.as_array().unwrap().len(), 10);

    let resp = app
        .oneshot(Request::get("/api/posts?limit=20").body(Body::empty()).unwrap())
        .await;
    assert_eq!(body_to_json(resp).await.as_array().unwrap().len(), 20);

    // Out of range falls back to the default.
    let resp = app
        .oneshot(Request::get("/api/posts?limit=100").body(Body::empty()).unwrap())
        .await;
    assert_eq!(body_to_json(resp).await.as_array().unwrap().len(), 10);
}

// ============================================================================
// Admin routes
// ============================================================================

#[tokio::test]
async fn test_admin_requires_credentials() {
    let app = TestApp::new(5);

    let resp = app
        .oneshot(Request::get("/api/admin/posts").body(Body::empty()).unwrap())
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        resp.headers()[header::WWW_AUTHENTICATE],
        r#"Basic realm="Admin Area""#
    );

    let resp = app
        .oneshot(
            Request::get("/api/admin/posts")
                .header(header::AUTHORIZATION, admin_auth("wrong"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_to_json(resp).await["error"], "Invalid credentials");
}

#[tokio::test]
async fn test_admin_lists_newest_first_with_total() {
    let app = TestApp::new(5);
    for title in ["older", "newer"] {
        app.submit("192.0.2.200", post_body(title)).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let resp = app
        .oneshot(
            Request::get("/api/admin/posts?limit=1")
                .header(header::AUTHORIZATION, admin_auth(ADMIN_PASSWORD))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_to_json(resp).await;
    assert_eq!(json["total"], 2);
    let posts = json["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["title"], "newer");
}

#[tokio::test]
async fn test_admin_delete_flow() {
    let app = TestApp::new(5);
    let created = body_to_json(app.submit("192.0.2.77", post_body("doomed")).await).await;
    let id = created["id"].as_i64().unwrap();

    let delete = |path: String| {
        Request::delete(path)
            .header(header::AUTHORIZATION, admin_auth(ADMIN_PASSWORD))
            .body(Body::empty())
            .unwrap()
    };

    let resp = app.oneshot(delete(format!("/api/admin/posts/{id}"))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_to_json(resp).await["message"], "Post deleted successfully");

    let resp = app.oneshot(delete(format!("/api/admin/posts/{id}"))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_to_json(resp).await["error"], "Post not found");

    let resp = app.oneshot(delete("/api/admin/posts/abc".to_string())).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_to_json(resp).await["error"], "Invalid post ID");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = TestApp::new(5);
    app.submit("192.0.2.8", post_body("counted")).await;

    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let text = body_to_string(resp).await;
    assert!(text.contains("ghostblog_posts_created_total 1"));
}
