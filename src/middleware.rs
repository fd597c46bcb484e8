// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Request gates: the submission rate limit and the admin password check.

use crate::error::AppError;
use crate::handlers::AppState;
use crate::identity::ClientIdentity;
use crate::metrics::Outcome;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Admit a post submission only if the caller's identity is under its limit.
///
/// A store failure rejects the request with 500; it is never read as
/// permission.
pub async fn submission_gate(
    State(state): State<Arc<AppState>>,
    ClientIdentity(identity): ClientIdentity,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match state.limiter.allow(&identity).await {
        Ok(true) => {
            state.metrics.record_decision(Outcome::Allowed);
            debug!(%identity, "Submission admitted");
            Ok(next.run(request).await)
        }
        Ok(false) => {
            state.metrics.record_decision(Outcome::Denied);
            let policy = state.limiter.policy();
            info!(%identity, max_events = policy.max_events, "Submission rate limited");
            Err(AppError::RateLimited {
                max_events: policy.max_events,
                retry_after_secs: policy.window.as_secs(),
            })
        }
        Err(e) => {
            state.metrics.record_decision(Outcome::Error);
            Err(AppError::store("Internal server error", e))
        }
    }
}

/// Require HTTP Basic credentials carrying the admin password.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .map(|v| v.to_str().unwrap_or_default());

    check_basic_auth(authorization, &state.config.admin_password)?;
    Ok(next.run(request).await)
}

/// Validate a Basic `Authorization` header against `password`.
///
/// The username is ignored.
pub fn check_basic_auth(authorization: Option<&str>, password: &str) -> Result<(), AppError> {
    let Some(value) = authorization.filter(|v| !v.is_empty()) else {
        return Err(AppError::Unauthorized {
            message: "Unauthorized",
            challenge: true,
        });
    };

    let invalid = || AppError::Unauthorized {
        message: "Invalid authorization header",
        challenge: false,
    };

    let encoded = value.strip_prefix("Basic ").ok_or_else(invalid)?;
    let decoded = STANDARD.decode(encoded.trim()).map_err(|_| invalid())?;
    let credentials = String::from_utf8(decoded).map_err(|_| invalid())?;
    let (_, supplied) = credentials.split_once(':').ok_or_else(invalid)?;

    if supplied != password {
        warn!("Admin authentication failed");
        return Err(AppError::Unauthorized {
            message: "Invalid credentials",
            challenge: false,
        });
    }

    Ok(())
}
