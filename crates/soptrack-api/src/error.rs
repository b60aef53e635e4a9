//! # API Error Types
//!
//! [`AppError`] is returned by every handler. Pages render it as an HTML
//! error page; the JSON API wraps it in [`ApiError`], which renders the
//! structured [`ErrorBody`]. Internal error details are logged, never
//! returned.
//!
//! `Unauthorized` is special on pages: it redirects to `/login` instead of
//! rendering anything.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::views;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "NOT_FOUND").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Form or query validation failed (422).
    #[error("{0}")]
    Validation(String),

    /// Request could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No valid session (redirect to login, or 401 for JSON).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Signed in, but the role is insufficient (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Conflict with current state, e.g. a duplicate username (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Too many attempts (429).
    #[error("{0}")]
    TooManyRequests(String),

    /// Internal server error (500). Logged, not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::TooManyRequests(_) => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Message safe to show a client.
    fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        }
    }

    fn log_if_internal(&self) {
        if matches!(self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Self::Unauthorized(reason) = &self {
            tracing::debug!(%reason, "redirecting to login");
            return Redirect::to("/login").into_response();
        }
        self.log_if_internal();
        let (status, _) = self.status_and_code();
        let page = views::error_page(status, &self.public_message());
        (status, Html(page)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(format!("database: {err}"))
    }
}

impl From<soptrack_core::ValidationError> for AppError {
    fn from(err: soptrack_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<soptrack_core::CoreError> for AppError {
    fn from(err: soptrack_core::CoreError) -> Self {
        match err {
            soptrack_core::CoreError::Validation(v) => v.into(),
            soptrack_core::CoreError::Csv(e) => Self::BadRequest(format!("unreadable CSV: {e}")),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        Self::Internal(format!("csv: {err}"))
    }
}

/// JSON rendering of [`AppError`] for `/api/*` routes.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl<E: Into<AppError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        err.log_if_internal();
        let (status, code) = err.status_and_code();
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: err.public_message(),
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
