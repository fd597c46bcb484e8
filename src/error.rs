// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP-facing error type.

use crate::store::StoreError;
use crate::validator::ValidationError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{message}")]
    Unauthorized {
        message: &'static str,
        challenge: bool,
    },

    #[error("{0}")]
    NotFound(&'static str),

    #[error("Rate limit exceeded. Maximum {max_events} posts per hour.")]
    RateLimited { max_events: u32, retry_after_secs: u64 },

    #[error("{public}")]
    Store {
        public: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Wrap a persistence failure with the message shown to the client.
    pub fn store(public: &'static str, source: StoreError) -> Self {
        Self::Store { public, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Store { .. } | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Self::Store { public, source } = &self {
            error!(error = %source, "{public}");
        }

        let status = self.status();
        let mut response = (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response();

        let headers = response.headers_mut();
        match self {
            Self::Unauthorized {
                challenge: true, ..
            } => {
                headers.insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static(r#"Basic realm="Admin Area""#),
                );
            }
            Self::RateLimited {
                retry_after_secs, ..
            } => {
                headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
            }
            _ => {}
        }

        response
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
