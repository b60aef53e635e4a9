//! # Application Configuration
//!
//! Every setting comes from a `SOPTRACK_*` environment variable with a
//! default suitable for a single-machine deployment. Insecure defaults are
//! accepted but logged at `warn` on startup.
//!
//! Custom `Debug` impls redact secrets so the config can be logged.

use std::fmt;

use soptrack_core::temporal::MAX_REACK_DAYS;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://instance/sops.db";
pub const DEFAULT_SESSION_SECRET: &str = "change-me-please";
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "ChangeMe123!";

/// A secret string wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Runtime configuration for the web application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub session_secret: SecretString,
    pub session_ttl_hours: u32,
    pub admin_username: String,
    pub admin_password: SecretString,
    /// Days after which an acknowledgment no longer counts.
    pub reack_days: u32,
    /// Seconds the SOP page must be open before acknowledging.
    pub min_read_seconds: u32,
    /// Document directory imported at startup when no SOPs exist.
    pub sop_dir: Option<String>,
    pub log_json: bool,
    /// Take the client address from `X-Forwarded-For`. Only safe behind a
    /// reverse proxy that overwrites the header.
    pub trust_proxy: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            port: 8000,
            session_secret: SecretString::new(DEFAULT_SESSION_SECRET),
            session_ttl_hours: 12,
            admin_username: DEFAULT_ADMIN_USERNAME.to_string(),
            admin_password: SecretString::new(DEFAULT_ADMIN_PASSWORD),
            reack_days: 365,
            min_read_seconds: 10,
            sop_dir: None,
            log_json: false,
            trust_proxy: false,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Unparseable numbers fall back to their defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let number = |key: &str, default: u32| match text(key) {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(key, value = %raw, "invalid number in environment, using default");
                default
            }),
            None => default,
        };

        let flag = |key: &str| matches!(text(key).as_deref(), Some("1" | "true" | "yes"));

        let mut reack_days = number("SOPTRACK_REACK_DAYS", defaults.reack_days);
        if reack_days > MAX_REACK_DAYS {
            tracing::warn!(
                value = reack_days,
                max = MAX_REACK_DAYS,
                "SOPTRACK_REACK_DAYS too large, clamping"
            );
            reack_days = MAX_REACK_DAYS;
        }

        let port = match text("SOPTRACK_PORT") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "invalid SOPTRACK_PORT, using default");
                defaults.port
            }),
            None => defaults.port,
        };

        Self {
            database_url: text("SOPTRACK_DATABASE_URL").unwrap_or(defaults.database_url),
            port,
            session_secret: text("SOPTRACK_SESSION_SECRET")
                .map(SecretString::new)
                .unwrap_or(defaults.session_secret),
            session_ttl_hours: number("SOPTRACK_SESSION_TTL_HOURS", defaults.session_ttl_hours),
            admin_username: text("SOPTRACK_ADMIN_USERNAME").unwrap_or(defaults.admin_username),
            admin_password: text("SOPTRACK_ADMIN_PASSWORD")
                .map(SecretString::new)
                .unwrap_or(defaults.admin_password),
            reack_days,
            min_read_seconds: number("SOPTRACK_MIN_READ_SECONDS", defaults.min_read_seconds),
            sop_dir: text("SOPTRACK_SOP_DIR"),
            log_json: flag("SOPTRACK_LOG_JSON"),
            trust_proxy: flag("SOPTRACK_TRUST_PROXY"),
        }
    }

    /// Log a warning for every insecure default still in effect.
    pub fn warn_insecure_defaults(&self) {
        if self.session_secret.expose() == DEFAULT_SESSION_SECRET {
            tracing::warn!("SOPTRACK_SESSION_SECRET is the default; sessions can be forged");
        }
        if self.admin_password.expose() == DEFAULT_ADMIN_PASSWORD {
            tracing::warn!(
                username = %self.admin_username,
                "SOPTRACK_ADMIN_PASSWORD is the default; change it after first login"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> AppConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let c = config(&[]);
        assert_eq!(c.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(c.port, 8000);
        assert_eq!(c.reack_days, 365);
        assert_eq!(c.min_read_seconds, 10);
        assert_eq!(c.session_ttl_hours, 12);
        assert!(c.sop_dir.is_none());
        assert!(!c.log_json);
        assert!(!c.trust_proxy);
    }

    #[test]
    fn overrides_are_parsed() {
        let c = config(&[
            ("SOPTRACK_PORT", "9000"),
            ("SOPTRACK_REACK_DAYS", "180"),
            ("SOPTRACK_MIN_READ_SECONDS", "0"),
            ("SOPTRACK_SOP_DIR", "/srv/policies"),
            ("SOPTRACK_LOG_JSON", "1"),
        ]);
        assert_eq!(c.port, 9000);
        assert_eq!(c.reack_days, 180);
        assert_eq!(c.min_read_seconds, 0);
        assert_eq!(c.sop_dir.as_deref(), Some("/srv/policies"));
        assert!(c.log_json);
    }

    #[test]
    fn garbage_numbers_fall_back() {
        let c = config(&[("SOPTRACK_PORT", "eighty"), ("SOPTRACK_REACK_DAYS", "-1")]);
        assert_eq!(c.port, 8000);
        assert_eq!(c.reack_days, 365);
    }

    #[test]
    fn reack_days_are_clamped() {
        let c = config(&[("SOPTRACK_REACK_DAYS", "4000000000"), ("SOPTRACK_TRUST_PROXY", "true")]);
        assert_eq!(c.reack_days, MAX_REACK_DAYS);
        assert!(c.trust_proxy);
    }

    #[test]
    fn debug_redacts_secrets() {
        let c = config(&[
            ("SOPTRACK_SESSION_SECRET", "super-secret-value"),
            ("SOPTRACK_ADMIN_PASSWORD", "Hunter2Hunter2"),
        ]);
        let debug = format!("{c:?}");
        assert!(!debug.contains("super-secret-value"));
        assert!(!debug.contains("Hunter2Hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}
