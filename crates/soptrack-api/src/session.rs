//! # Signed Session Cookie
//!
//! The session lives entirely in the cookie:
//!
//! ```text
//! soptrack_session = v1.<base64url(json{user_id, issued_at})>.<base64url(hmac_sha256)>
//! ```
//!
//! The MAC covers the encoded payload part. A session is valid when the
//! signature checks out and `issued_at` is within the configured lifetime.
//! The user row is re-read on every request, so deactivating a user ends
//! their session immediately.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "soptrack_session";

const TOKEN_VERSION: &str = "v1";
const MAX_TOKEN_LEN: usize = 512;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("malformed session token")]
    Malformed,
    #[error("unsupported session token version")]
    UnsupportedVersion,
    #[error("session signature mismatch")]
    BadSignature,
    #[error("session expired")]
    Expired,
    #[error("session signing failed: {0}")]
    Signing(String),
}

/// Claims carried by the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user_id: i64,
    /// Unix seconds.
    pub issued_at: i64,
}

fn mac(secret: &[u8]) -> Result<HmacSha256, SessionError> {
    <HmacSha256 as Mac>::new_from_slice(secret).map_err(|e| SessionError::Signing(e.to_string()))
}

/// Sign claims into a cookie value.
pub fn encode(claims: &SessionClaims, secret: &[u8]) -> Result<String, SessionError> {
    let payload = serde_json::to_vec(claims).map_err(|e| SessionError::Signing(e.to_string()))?;
    let payload_part = URL_SAFE_NO_PAD.encode(payload);
    let mut m = mac(secret)?;
    m.update(payload_part.as_bytes());
    let sig_part = URL_SAFE_NO_PAD.encode(m.finalize().into_bytes());
    Ok(format!("{TOKEN_VERSION}.{payload_part}.{sig_part}"))
}

/// Verify a cookie value and return its claims.
pub fn decode(
    token: &str,
    secret: &[u8],
    now: i64,
    ttl_seconds: i64,
) -> Result<SessionClaims, SessionError> {
    if token.len() > MAX_TOKEN_LEN {
        return Err(SessionError::Malformed);
    }
    let mut parts = token.splitn(3, '.');
    let (Some(version), Some(payload_part), Some(sig_part)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return Err(SessionError::Malformed);
    };
    if version != TOKEN_VERSION {
        return Err(SessionError::UnsupportedVersion);
    }

    let sig = URL_SAFE_NO_PAD
        .decode(sig_part)
        .map_err(|_| SessionError::Malformed)?;
    let mut m = mac(secret)?;
    m.update(payload_part.as_bytes());
    m.verify_slice(&sig).map_err(|_| SessionError::BadSignature)?;

    let payload = URL_SAFE_NO_PAD
        .decode(payload_part)
        .map_err(|_| SessionError::Malformed)?;
    let claims: SessionClaims =
        serde_json::from_slice(&payload).map_err(|_| SessionError::Malformed)?;

    let age = now - claims.issued_at;
    if age < 0 || age > ttl_seconds {
        return Err(SessionError::Expired);
    }
    Ok(claims)
}

/// Add a fresh session cookie for `user_id` to the jar.
pub fn start(
    jar: CookieJar,
    user_id: i64,
    secret: &[u8],
    now: i64,
) -> Result<CookieJar, SessionError> {
    let value = encode(&SessionClaims { user_id, issued_at: now }, secret)?;
    Ok(jar.add(
        Cookie::build((SESSION_COOKIE, value))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/"),
    ))
}

/// Remove the session cookie.
pub fn end(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";

    #[test]
    fn encode_then_decode() {
        let claims = SessionClaims { user_id: 7, issued_at: 1_000 };
        let token = encode(&claims, SECRET).unwrap();
        assert!(token.starts_with("v1."));
        assert_eq!(decode(&token, SECRET, 1_100, 3_600), Ok(claims));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = encode(&SessionClaims { user_id: 7, issued_at: 1_000 }, SECRET).unwrap();
        assert_eq!(
            decode(&token, b"other", 1_000, 3_600),
            Err(SessionError::BadSignature)
        );
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let token = encode(&SessionClaims { user_id: 7, issued_at: 1_000 }, SECRET).unwrap();
        let forged_payload =
            URL_SAFE_NO_PAD.encode(br#"{"user_id":1,"issued_at":1000}"#);
        let sig = token.rsplit('.').next().unwrap();
        let forged = format!("v1.{forged_payload}.{sig}");
        assert_eq!(
            decode(&forged, SECRET, 1_000, 3_600),
            Err(SessionError::BadSignature)
        );
    }

    #[test]
    fn expired_and_future_tokens_are_rejected() {
        let token = encode(&SessionClaims { user_id: 7, issued_at: 1_000 }, SECRET).unwrap();
        assert_eq!(decode(&token, SECRET, 5_000, 3_600), Err(SessionError::Expired));
        assert_eq!(decode(&token, SECRET, 500, 3_600), Err(SessionError::Expired));
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(decode("nope", SECRET, 0, 10), Err(SessionError::Malformed));
        assert_eq!(
            decode("v2.abc.def", SECRET, 0, 10),
            Err(SessionError::UnsupportedVersion)
        );
        assert_eq!(
            decode(&"x".repeat(600), SECRET, 0, 10),
            Err(SessionError::Malformed)
        );
    }
}
