// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Ghost Blog Service
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (and `.env`):
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080); `PORT` overrides the port
//! - `DATABASE_URL`: Postgres connection string, or `memory`
//! - `ADMIN_PASSWORD`: Password for the admin routes (default: admin123)
//! - `ENVIRONMENT`: `production` switches logs to JSON
//! - `RATE_LIMIT_MAX_EVENTS`: Posts per identity per window (default: 5)
//! - `RATE_LIMIT_WINDOW_SECS`: Window length (default: 3600)
//! - `RATE_LIMIT_CLEANUP_INTERVAL_SECS`: Expired record sweep interval (default: 600)
//! - `GEO_ENABLED`, `GEO_ENDPOINT`, `GEO_TIMEOUT_MS`: Country lookup
//! - `METRICS_ENABLED`, `METRICS_PATH`: Prometheus endpoint

use ghost_blog::{app, config::Config, limiter::spawn_cleanup};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // Initialize tracing
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    if config.is_production() {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    info!(
        bind_addr = %config.bind_addr,
        environment = %config.environment,
        max_events = config.rate_limit.max_events,
        window_secs = config.rate_limit.window_secs,
        geo_enabled = config.geo.enabled,
        "Starting Ghost Blog"
    );

    let cleanup_every = config.rate_limit.cleanup_interval();
    let bind_addr = config.bind_addr.clone();
    let state = app::build_state(config).await?;

    let cleanup = spawn_cleanup(state.limiter.clone(), cleanup_every, state.metrics.clone());

    let app = app::router(state);

    let addr: SocketAddr = bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    cleanup.abort();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
