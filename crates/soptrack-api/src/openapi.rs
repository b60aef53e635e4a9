//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented JSON routes into one OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::session::SESSION_COOKIE;
use crate::state::AppState;

/// Adds the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    SESSION_COOKIE,
                    "Signed session cookie set by POST /login.",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SOPTrack API",
        description = "Read-only JSON views of the SOP catalog and staff acknowledgment compliance.\n\nAuthentication uses the browser session cookie. Catalog and compliance endpoints require the training lead role or higher; metrics require an administrator.",
        license(name = "BUSL-1.1"),
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server"),
    ),
    security(
        ("session_cookie" = [])
    ),
    paths(
        crate::routes::api::list_sops,
        crate::routes::api::compliance,
        crate::routes::api::metrics,
    ),
    components(
        schemas(
            crate::db::sops::SopSummary,
            crate::routes::api::RateBody,
            crate::routes::api::SopComplianceBody,
            crate::routes::api::CategoryComplianceBody,
            crate::routes::api::ComplianceBody,
            crate::middleware::metrics::MetricsSnapshot,
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
        ),
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "sops", description = "SOP catalog"),
        (name = "compliance", description = "Acknowledgment compliance for the current SOP versions"),
        (name = "operations", description = "Process counters"),
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI JSON document at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_lists_json_paths() {
        let spec = ApiDoc::openapi();
        for path in ["/api/v1/sops", "/api/v1/compliance", "/api/v1/metrics"] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn spec_has_schemas_and_cookie_scheme() {
        let spec = ApiDoc::openapi();
        let components = spec.components.as_ref().unwrap();
        assert!(components.schemas.contains_key("ComplianceBody"));
        assert!(components.schemas.contains_key("SopSummary"));
        assert!(components.security_schemes.contains_key("session_cookie"));
    }

    #[test]
    fn spec_serializes_to_json() {
        let json = serde_json::to_string(&ApiDoc::openapi()).unwrap();
        assert!(json.contains("openapi"));
        assert!(json.contains("soptrack_session"));
    }
}
