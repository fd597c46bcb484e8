// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the public and admin post routes.

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::geo::GeoLookup;
use crate::identity::ClientIdentity;
use crate::limiter::RateLimiter;
use crate::metrics::Metrics;
use crate::store::{NewPost, Post, PostStore};
use crate::validator::PostValidator;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

const RANDOM_DEFAULT_LIMIT: i64 = 10;
const RANDOM_MAX_LIMIT: i64 = 20;
const ADMIN_DEFAULT_LIMIT: i64 = 50;

/// Shared application state.
pub struct AppState {
    pub limiter: RateLimiter,
    pub posts: Arc<dyn PostStore>,
    pub geo: Arc<dyn GeoLookup>,
    pub validator: PostValidator,
    pub metrics: Metrics,
    pub config: Config,
}

/// Post submission body. Missing fields read as empty.
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// `limit` / `offset` query parameters, kept raw so bad values fall back to
/// defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl PageParams {
    fn limit(&self, default: i64, max: Option<i64>) -> i64 {
        self.limit
            .as_deref()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|&l| l > 0 && max.map_or(true, |m| l <= m))
            .unwrap_or(default)
    }

    fn offset(&self) -> i64 {
        self.offset
            .as_deref()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|&o| o >= 0)
            .unwrap_or(0)
    }
}

/// Admin listing response.
#[derive(Debug, Serialize)]
pub struct AdminPostsResponse {
    pub posts: Vec<Post>,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}

/// Random selection of posts for the public feed.
pub async fn random_posts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<Post>>> {
    let limit = params.limit(RANDOM_DEFAULT_LIMIT, Some(RANDOM_MAX_LIMIT));
    let posts = state
        .posts
        .random(limit, params.offset())
        .await
        .map_err(|e| AppError::store("Failed to fetch posts", e))?;
    Ok(Json(posts))
}

/// Accept an anonymous post. Runs behind the submission gate.
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    ClientIdentity(identity): ClientIdentity,
    payload: std::result::Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(req) = payload.map_err(|rejection| {
        warn!(error = %rejection, "Rejected post body");
        AppError::BadRequest("Invalid request body".to_string())
    })?;

    state.validator.validate(&req.title, &req.content)?;

    let country = state.geo.country_for(&identity).await;
    info!(%identity, %country, "Post submission");

    let post = state
        .posts
        .create(
            NewPost {
                title: req.title,
                content: req.content,
                country,
            },
            Utc::now(),
        )
        .await
        .map_err(|e| AppError::store("Failed to create post", e))?;

    state.metrics.record_post_created();
    Ok((StatusCode::CREATED, Json(post)))
}

/// Every post, newest first, with the overall count.
pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> Result<Json<AdminPostsResponse>> {
    let posts = state
        .posts
        .list(params.limit(ADMIN_DEFAULT_LIMIT, None), params.offset())
        .await
        .map_err(|e| AppError::store("Failed to fetch posts", e))?;

    let total = match state.posts.count().await {
        Ok(total) => total,
        Err(e) => {
            warn!(error = %e, "Error counting posts");
            0
        }
    };

    Ok(Json(AdminPostsResponse { posts, total }))
}

/// Remove a post by id.
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let id: i64 = raw_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid post ID".to_string()))?;

    let deleted = state
        .posts
        .delete(id)
        .await
        .map_err(|e| AppError::store("Failed to delete post", e))?;

    if !deleted {
        return Err(AppError::NotFound("Post not found"));
    }

    info!(id, "Post deleted");
    Ok(Json(MessageResponse {
        message: "Post deleted successfully",
    }))
}

/// Prometheus text exposition.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse> {
    let body = state
        .metrics
        .render()
        .map_err(|e| AppError::Internal(format!("Failed to render metrics: {e}")))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}
