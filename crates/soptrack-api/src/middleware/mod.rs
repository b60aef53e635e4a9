//! # Middleware Stack
//!
//! Tower middleware for the web layer:
//! - [`metrics`]: in-process request and error counters.
//! - [`rate_limit`]: per-client login throttling.
//!
//! Request tracing uses `tower_http::trace::TraceLayer` directly in
//! [`crate::app`]; session resolution lives in [`crate::auth`].

pub mod metrics;
pub mod rate_limit;
