//! Audit log page.

use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;

use crate::auth::AdminUser;
use crate::db::{self, audit::AuditFilter, audit::PAGE_LIMIT};
use crate::error::AppError;
use crate::state::AppState;
use crate::views;

pub fn router() -> Router<AppState> {
    Router::new().route("/admin/audit", get(index))
}

async fn index(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Query(filter): Query<AuditFilter>,
) -> Result<Html<String>, AppError> {
    let rows = db::audit::search(&state.pool, &filter, Some(PAGE_LIMIT)).await?;
    let usernames = db::users::usernames(&state.pool).await?;
    let actions = db::audit::actions(&state.pool).await?;
    Ok(Html(views::audit::audit_page(
        &user, &rows, &filter, &usernames, &actions,
    )))
}
