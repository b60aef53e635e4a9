//! CSV downloads.

use axum::extract::{Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;

use super::compliance::WindowQuery;
use crate::auth::{AdminUser, ComplianceViewer};
use crate::csv_export;
use crate::db::{self, audit::AuditFilter};
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/export/acknowledgments.csv", get(acknowledgments))
        .route("/admin/export/sops.csv", get(sops))
        .route("/admin/export/audit.csv", get(audit))
        .route("/compliance/export.csv", get(compliance))
}

async fn acknowledgments(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
) -> Result<Response, AppError> {
    let rows = db::acknowledgments::export_rows(&state.pool).await?;
    tracing::info!(user = %user.username, rows = rows.len(), "exporting acknowledgments");
    Ok(csv_export::attachment(
        "acknowledgments.csv",
        csv_export::acknowledgments(&rows)?,
    ))
}

async fn sops(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
) -> Result<Response, AppError> {
    let rows = db::sops::list_by_title(&state.pool).await?;
    tracing::info!(user = %user.username, rows = rows.len(), "exporting SOPs");
    Ok(csv_export::attachment("sops.csv", csv_export::sops(&rows)?))
}

/// The full audit log, honoring the page's filters but not its row limit.
async fn audit(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Query(filter): Query<AuditFilter>,
) -> Result<Response, AppError> {
    let rows = db::audit::search(&state.pool, &filter, None).await?;
    tracing::info!(user = %user.username, rows = rows.len(), "exporting audit log");
    Ok(csv_export::attachment("audit.csv", csv_export::audit(&rows)?))
}

async fn compliance(
    State(state): State<AppState>,
    ComplianceViewer(user): ComplianceViewer,
    Query(query): Query<WindowQuery>,
) -> Result<Response, AppError> {
    let window = query.window(state.config.reack_days);
    let report = db::compliance::report(&state.pool, window).await?;
    tracing::info!(user = %user.username, start = %window.start, "exporting compliance report");
    Ok(csv_export::attachment(
        "compliance.csv",
        csv_export::compliance(&report)?,
    ))
}
