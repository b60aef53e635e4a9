//! # Custom Extractors
//!
//! [`ClientInfo`] captures the evidence stored with an acknowledgment and
//! the key used by the login throttle. The address is the socket peer;
//! `X-Forwarded-For` is read only when `SOPTRACK_TRUST_PROXY` is set.
//! [`extract_form`] maps form deserialization failures to
//! [`AppError::BadRequest`].

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::rejection::FormRejection;
use axum::extract::ConnectInfo;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum::Form;

use crate::error::AppError;
use crate::state::AppState;

const MAX_USER_AGENT_LEN: usize = 500;

/// Client address and user agent of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    /// Key for per-client throttling.
    pub fn key(&self) -> &str {
        self.ip_address.as_deref().unwrap_or("unknown")
    }

    fn from_parts(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> Self {
        let forwarded = headers
            .get("x-forwarded-for")
            .filter(|_| trust_proxy)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned);
        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.chars().take(MAX_USER_AGENT_LEN).collect());
        Self {
            ip_address: forwarded.or_else(|| peer.map(|addr| addr.ip().to_string())),
            user_agent,
        }
    }
}

#[axum::async_trait]
impl axum::extract::FromRequestParts<AppState> for ClientInfo {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self::from_parts(&parts.headers, peer, state.config.trust_proxy))
    }
}

/// Extract a form body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_form<T>(result: Result<Form<T>, FormRejection>) -> Result<T, AppError> {
    result
        .map(|Form(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn forwarded_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8"));
        headers
    }

    #[test]
    fn forwarded_for_ignored_without_trusted_proxy() {
        let peer = Some(SocketAddr::from(([127, 0, 0, 1], 80)));
        let info = ClientInfo::from_parts(&forwarded_headers(), peer, false);
        assert_eq!(info.ip_address.as_deref(), Some("127.0.0.1"));
        assert_eq!(info.user_agent.as_deref(), Some("curl/8"));

        let info = ClientInfo::from_parts(&forwarded_headers(), None, false);
        assert_eq!(info.key(), "unknown");
    }

    #[test]
    fn forwarded_for_wins_behind_trusted_proxy() {
        let peer = Some(SocketAddr::from(([127, 0, 0, 1], 80)));
        let info = ClientInfo::from_parts(&forwarded_headers(), peer, true);
        assert_eq!(info.ip_address.as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn peer_address_is_the_fallback() {
        let info =
            ClientInfo::from_parts(&HeaderMap::new(), Some(SocketAddr::from(([10, 1, 2, 3], 9))), true);
        assert_eq!(info.key(), "10.1.2.3");
        assert_eq!(ClientInfo::default().key(), "unknown");
    }
}
