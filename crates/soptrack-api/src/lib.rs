//! # soptrack-api: SOP Acknowledgment Web Application
//!
//! Server-rendered HTML over Axum/Tower/Tokio with SQLite persistence.
//! Staff read standard operating procedures and sign for the current
//! version; managers watch compliance; administrators maintain SOPs, the
//! staff roster, and user accounts.
//!
//! ## Route Areas
//!
//! - `/login`, `/logout`, `/account`: sessions and password changes
//! - `/`, `/sop/:id`: browse, read, print, acknowledge
//! - `/compliance`: dashboard and CSV export (training lead and above)
//! - `/admin/*`: SOPs, roster, users, audit log, exports (admin)
//! - `/api/v1/*`, `/openapi.json`: read-only JSON
//! - `/health/*`: probes, no session required
//!
//! ## Middleware Stack (Tower)
//!
//! TraceLayer → Metrics → LoginThrottle → Session
//!
//! The session layer only attaches identity; each handler states the
//! access it needs through the extractors in [`auth`].

pub mod auth;
pub mod config;
pub mod csv_export;
pub mod db;
pub mod error;
pub mod extractors;
pub mod import;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod session;
pub mod state;
pub mod views;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::middleware::metrics::{metrics_middleware, ApiMetrics};
use crate::middleware::rate_limit::{login_throttle_middleware, LoginThrottle, RateLimitConfig};

pub use error::AppError;
pub use state::AppState;

/// Assemble the application with the default login throttle.
pub fn app(state: AppState) -> Router {
    app_with_throttle(state, RateLimitConfig::default())
}

/// Assemble the application router with all routes and middleware.
///
/// Health probes are mounted outside the session middleware.
pub fn app_with_throttle(state: AppState, throttle: RateLimitConfig) -> Router {
    let metrics = ApiMetrics::new();
    let throttle = LoginThrottle::new(throttle);

    let pages = Router::new()
        .merge(routes::session::router())
        .merge(routes::sops::router())
        .merge(routes::compliance::router())
        .merge(routes::admin::router())
        .merge(routes::staff::router())
        .merge(routes::users::router())
        .merge(routes::audit::router())
        .merge(routes::exports::router())
        .merge(routes::api::router())
        .merge(openapi::router())
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), auth::session_middleware))
        .layer(from_fn_with_state(state.clone(), login_throttle_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(metrics))
        .layer(Extension(throttle))
        .with_state(state.clone());

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .with_state(state);

    Router::new().merge(health).merge(pages)
}

async fn not_found() -> AppError {
    AppError::NotFound("That page does not exist.".into())
}

/// Liveness probe: the process is up.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: the database answers.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Err(e) = sqlx::query("SELECT 1").execute(&state.pool).await {
        tracing::warn!("Database health check failed: {e}");
        return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
    }
    (StatusCode::OK, "ready").into_response()
}
