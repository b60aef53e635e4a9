//! # Login Throttling
//!
//! Fixed-window counter keyed by client address, applied to `POST /login`
//! only. A client that exceeds the limit gets a 429 page until its window
//! rolls over.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::Request;
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;

use crate::error::AppError;
use crate::extractors::ClientInfo;

/// Throttle configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Attempts allowed per window.
    pub max_attempts: u64,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            window: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
struct Window {
    count: u64,
    started: Instant,
}

/// Shared login throttle state.
#[derive(Debug, Clone)]
pub struct LoginThrottle {
    config: RateLimitConfig,
    windows: Arc<Mutex<HashMap<String, Window>>>,
}

impl LoginThrottle {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Count an attempt from `key`; `false` when over the limit.
    pub fn check(&self, key: &str, now: Instant) -> bool {
        let mut windows = self.windows.lock();
        windows.retain(|_, w| now.duration_since(w.started) < self.config.window);

        let window = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started: now,
        });
        if window.count >= self.config.max_attempts {
            false
        } else {
            window.count += 1;
            true
        }
    }
}

impl Default for LoginThrottle {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

/// Middleware that throttles login submissions per client.
pub async fn login_throttle_middleware(
    client: ClientInfo,
    request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::POST && request.uri().path() == "/login" {
        if let Some(throttle) = request.extensions().get::<LoginThrottle>() {
            if !throttle.check(client.key(), Instant::now()) {
                tracing::warn!(client = client.key(), "login attempts throttled");
                return AppError::TooManyRequests(
                    "Too many login attempts. Try again in a few minutes.".into(),
                )
                .into_response();
            }
        }
    }
    next.run(request).await
}
