//! Compliance dashboard.

use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use soptrack_core::ComplianceWindow;

use crate::auth::ComplianceViewer;
use crate::db;
use crate::error::AppError;
use crate::state::AppState;
use crate::views;

const RECENT_LIMIT: i64 = 25;

/// Optional `start_date` / `end_date` narrowing of the window.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct WindowQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl WindowQuery {
    /// Resolve against today (UTC) and the configured re-acknowledgment period.
    pub fn window(&self, reack_days: u32) -> ComplianceWindow {
        ComplianceWindow::resolve(
            Utc::now().date_naive(),
            reack_days,
            self.start_date.as_deref(),
            self.end_date.as_deref(),
        )
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/compliance", get(dashboard))
}

async fn dashboard(
    State(state): State<AppState>,
    ComplianceViewer(user): ComplianceViewer,
    Query(query): Query<WindowQuery>,
) -> Result<Html<String>, AppError> {
    let window = query.window(state.config.reack_days);
    let report = db::compliance::report(&state.pool, window).await?;
    let recent = db::acknowledgments::recent_in_window(&state.pool, &window, RECENT_LIMIT).await?;
    Ok(Html(views::compliance::compliance_page(&user, &report, &recent)))
}
