//! # JSON API
//!
//! Read-only endpoints for the SOP catalog, compliance figures, and request
//! counters. They share the browser session but answer with JSON errors
//! instead of redirects: no session is a 401, an insufficient role a 403.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Serialize;
use soptrack_core::compliance::{ComplianceRate, ComplianceReport};
use soptrack_core::Role;
use utoipa::ToSchema;

use super::compliance::WindowQuery;
use crate::auth::{require_role, CurrentUser};
use crate::db::{self, sops::SopSummary};
use crate::error::{ApiError, AppError};
use crate::middleware::metrics::{ApiMetrics, MetricsSnapshot};
use crate::state::AppState;

// ── Response types ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct RateBody {
    pub acknowledged: u64,
    pub eligible: u64,
    pub percent: f64,
}

impl From<ComplianceRate> for RateBody {
    fn from(rate: ComplianceRate) -> Self {
        Self {
            acknowledged: rate.acknowledged,
            eligible: rate.eligible,
            percent: (rate.percent() * 10.0).round() / 10.0,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SopComplianceBody {
    pub sop_id: i64,
    pub title: String,
    pub category: String,
    pub current_version: i64,
    pub rate: RateBody,
    /// Active staff without a qualifying acknowledgment.
    pub missing: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryComplianceBody {
    pub category: String,
    pub sop_count: u64,
    pub rate: RateBody,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ComplianceBody {
    /// First counted day, `YYYY-MM-DD`.
    pub start_date: String,
    /// Last counted day, absent when unbounded.
    pub end_date: Option<String>,
    pub staff_count: u64,
    pub sop_count: u64,
    pub overall: RateBody,
    pub sops: Vec<SopComplianceBody>,
    pub categories: Vec<CategoryComplianceBody>,
}

impl From<ComplianceReport> for ComplianceBody {
    fn from(report: ComplianceReport) -> Self {
        Self {
            start_date: report.window.start_param(),
            end_date: report.window.end_param(),
            staff_count: report.staff_count,
            sop_count: report.sop_count,
            overall: report.overall.into(),
            sops: report
                .sops
                .into_iter()
                .map(|line| SopComplianceBody {
                    sop_id: line.sop.id,
                    title: line.sop.title,
                    category: line.sop.category,
                    current_version: line.sop.current_version,
                    rate: line.rate.into(),
                    missing: line.missing,
                })
                .collect(),
            categories: report
                .categories
                .into_iter()
                .map(|c| CategoryComplianceBody {
                    category: c.category,
                    sop_count: c.sop_count,
                    rate: c.rate.into(),
                })
                .collect(),
        }
    }
}

// ── Handlers ────────────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/sops", get(list_sops))
        .route("/api/v1/compliance", get(compliance))
        .route("/api/v1/metrics", get(metrics))
}

fn require(user: Option<CurrentUser>, minimum: Role) -> Result<CurrentUser, ApiError> {
    let user = user.ok_or_else(|| AppError::Unauthorized("no session".into()))?;
    require_role(&user, minimum)?;
    Ok(user)
}

/// List SOPs, most recently updated first.
#[utoipa::path(
    get,
    path = "/api/v1/sops",
    responses(
        (status = 200, description = "SOP catalog", body = Vec<SopSummary>),
        (status = 401, description = "No session", body = crate::error::ErrorBody),
        (status = 403, description = "Role below training lead", body = crate::error::ErrorBody),
    ),
    tag = "sops"
)]
pub(crate) async fn list_sops(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
) -> Result<Json<Vec<SopSummary>>, ApiError> {
    require(user, Role::TrainingLead)?;
    Ok(Json(db::sops::list_recent(&state.pool).await?))
}

/// Compliance figures for the resolved window.
#[utoipa::path(
    get,
    path = "/api/v1/compliance",
    params(
        ("start_date" = Option<String>, Query, description = "Narrow the window to start no earlier than this day (YYYY-MM-DD)"),
        ("end_date" = Option<String>, Query, description = "Last counted day (YYYY-MM-DD)"),
    ),
    responses(
        (status = 200, description = "Compliance report", body = ComplianceBody),
        (status = 401, description = "No session", body = crate::error::ErrorBody),
        (status = 403, description = "Role below training lead", body = crate::error::ErrorBody),
    ),
    tag = "compliance"
)]
pub(crate) async fn compliance(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<ComplianceBody>, ApiError> {
    require(user, Role::TrainingLead)?;
    let window = query.window(state.config.reack_days);
    let report = db::compliance::report(&state.pool, window).await?;
    Ok(Json(report.into()))
}

/// Request and error counters since startup.
#[utoipa::path(
    get,
    path = "/api/v1/metrics",
    responses(
        (status = 200, description = "Counters", body = MetricsSnapshot),
        (status = 401, description = "No session", body = crate::error::ErrorBody),
        (status = 403, description = "Not an administrator", body = crate::error::ErrorBody),
    ),
    tag = "operations"
)]
pub(crate) async fn metrics(
    user: Option<CurrentUser>,
    Extension(metrics): Extension<ApiMetrics>,
) -> Result<Json<MetricsSnapshot>, ApiError> {
    require(user, Role::Admin)?;
    Ok(Json(metrics.snapshot()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use soptrack_core::compliance::{SopRef, StaffRef};
    use soptrack_core::ComplianceWindow;
    use std::collections::HashSet;

    #[test]
    fn report_body_rounds_percentages() {
        let window = ComplianceWindow {
            start: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end: None,
        };
        let sops = vec![SopRef {
            id: 1,
            title: "Fire Drill".into(),
            category: "Safety".into(),
            current_version: 2,
        }];
        let staff = vec![
            StaffRef { id: 1, name: "Ann".into() },
            StaffRef { id: 2, name: "Bo".into() },
            StaffRef { id: 3, name: "Cy".into() },
        ];
        let pairs: HashSet<(i64, i64)> = [(1, 1)].into_iter().collect();
        let body = ComplianceBody::from(ComplianceReport::build(window, sops, staff, &pairs));

        assert_eq!(body.start_date, "2025-01-01");
        assert_eq!(body.end_date, None);
        assert_eq!(body.sops[0].rate.percent, 33.3);
        assert_eq!(body.sops[0].missing, vec!["Bo", "Cy"]);
        assert_eq!(body.categories[0].category, "Safety");
    }
}
