// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Router assembly and state wiring.

use crate::config::Config;
use crate::geo::{GeoLookup, IpApiLocator, StaticLocator, UNKNOWN};
use crate::handlers::{self, AppState};
use crate::limiter::{RateLimitPolicy, RateLimiter};
use crate::metrics::Metrics;
use crate::middleware::{require_admin, submission_gate};
use crate::store::{
    postgres, MemoryPostStore, MemoryRateLimitStore, PgPostStore, PgRateLimitStore, PostStore,
    RateLimitStore,
};
use crate::validator::PostValidator;
use anyhow::Context;
use axum::{
    handler::Handler,
    http::{header, Method},
    middleware,
    routing::{delete, get},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the application state from configuration.
///
/// `DATABASE_URL=memory` selects the in-process stores; anything else is a
/// Postgres connection string.
pub async fn build_state(config: Config) -> anyhow::Result<Arc<AppState>> {
    let (rate_limits, posts): (Arc<dyn RateLimitStore>, Arc<dyn PostStore>) =
        if config.uses_memory_store() {
            info!("Using in-memory stores");
            (
                Arc::new(MemoryRateLimitStore::new()),
                Arc::new(MemoryPostStore::new()),
            )
        } else {
            let pool = postgres::connect(&config.database_url)
                .await
                .context("failed to connect to database")?;
            info!("Connected to Postgres");
            (
                Arc::new(PgRateLimitStore::new(pool.clone())),
                Arc::new(PgPostStore::new(pool)),
            )
        };

    let geo: Arc<dyn GeoLookup> = if config.geo.enabled {
        Arc::new(IpApiLocator::new(&config.geo).context("failed to build geolocation client")?)
    } else {
        Arc::new(StaticLocator::new(UNKNOWN))
    };

    let metrics = Metrics::new().context("failed to register metrics")?;
    let limiter = RateLimiter::new(rate_limits, RateLimitPolicy::from(&config.rate_limit));

    Ok(Arc::new(AppState {
        limiter,
        posts,
        geo,
        validator: PostValidator::default(),
        metrics,
        config,
    }))
}

/// Assemble every route with its gates and the shared layers.
pub fn router(state: Arc<AppState>) -> Router {
    let gated_submit =
        handlers::create_post.layer(middleware::from_fn_with_state(state.clone(), submission_gate));

    let public = Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/posts",
            get(handlers::random_posts).post(gated_submit),
        );

    let admin = Router::new()
        .route("/api/admin/posts", get(handlers::list_posts))
        .route("/api/admin/posts/:id", delete(handlers::delete_post))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let mut app = public.merge(admin);
    if state.config.metrics.enabled {
        app = app.route(&state.config.metrics.path, get(handlers::metrics));
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    app.layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
