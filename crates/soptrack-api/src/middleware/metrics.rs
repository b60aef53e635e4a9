//! # Request Metrics
//!
//! In-process counters, readable by administrators at `/api/v1/metrics`:
//! all requests, error responses, rejected sign-ins (`POST /login`
//! answered 401), and requests turned away by the login throttle (429).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::Request;
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use serde::Serialize;
use utoipa::ToSchema;

/// Shared metrics state.
#[derive(Debug, Clone, Default)]
pub struct ApiMetrics {
    pub request_count: Arc<AtomicU64>,
    pub error_count: Arc<AtomicU64>,
    pub login_failures: Arc<AtomicU64>,
    pub throttled: Arc<AtomicU64>,
}

/// Point-in-time counter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub errors: u64,
    pub login_failures: u64,
    pub throttled: u64,
}

impl ApiMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Responses with a 4xx or 5xx status.
    pub fn errors(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests(),
            errors: self.errors(),
            login_failures: self.login_failures.load(Ordering::Relaxed),
            throttled: self.throttled.load(Ordering::Relaxed),
        }
    }
}

impl ApiMetrics {
    fn observe(&self, login_attempt: bool, status: StatusCode) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        if status.is_client_error() || status.is_server_error() {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            self.throttled.fetch_add(1, Ordering::Relaxed);
        } else if login_attempt && status == StatusCode::UNAUTHORIZED {
            self.login_failures.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Count every response, classifying sign-in failures and throttling.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let Some(metrics) = request.extensions().get::<ApiMetrics>().cloned() else {
        return next.run(request).await;
    };
    let login_attempt = request.method() == Method::POST && request.uri().path() == "/login";

    let response = next.run(request).await;
    metrics.observe(login_attempt, response.status());
    response
}
