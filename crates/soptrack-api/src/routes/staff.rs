//! Roster administration: list, add, CSV import, activation.

use axum::extract::rejection::FormRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use soptrack_core::roster::parse_roster;
use soptrack_core::validation::StaffInput;

use crate::auth::{AdminUser, CurrentUser};
use crate::db::{self, audit::AuditEntry, staff::RosterImportSummary};
use crate::error::AppError;
use crate::extractors::extract_form;
use crate::state::AppState;
use crate::views::{self, staff::RosterMessages};

#[derive(Debug, Default, Deserialize)]
struct RosterQuery {
    notice: Option<String>,
    inserted: Option<u64>,
    duplicates: Option<u64>,
    skipped: Option<u64>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/staff", get(index))
        .route("/admin/staff/new", post(create))
        .route("/admin/staff/import", post(import))
        .route("/admin/staff/:id/toggle", post(toggle))
}

async fn render(
    state: &AppState,
    user: &CurrentUser,
    status: StatusCode,
    messages: RosterMessages<'_>,
) -> Result<Response, AppError> {
    let staff = db::staff::list(&state.pool).await?;
    Ok((status, Html(views::staff::staff_page(user, &staff, &messages))).into_response())
}

async fn index(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Query(query): Query<RosterQuery>,
) -> Result<Response, AppError> {
    let import = query.inserted.map(|inserted| RosterImportSummary {
        inserted,
        duplicates: query.duplicates.unwrap_or(0),
        skipped: query.skipped.unwrap_or(0),
    });
    render(
        &state,
        &user,
        StatusCode::OK,
        RosterMessages {
            notice: query.notice.as_deref(),
            error: None,
            import,
        },
    )
    .await
}

async fn create(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    form: Result<Form<StaffInput>, FormRejection>,
) -> Result<Response, AppError> {
    let input = extract_form(form)?;
    let draft = match input.validate() {
        Ok(draft) => draft,
        Err(err) => {
            let message = err.to_string();
            return render(&state, &user, StatusCode::UNPROCESSABLE_ENTITY, RosterMessages {
                error: Some(&message),
                ..Default::default()
            })
            .await;
        }
    };

    let Some(id) = db::staff::insert(&state.pool, &draft).await? else {
        let message = format!("{} is already on the roster", draft.name);
        return render(&state, &user, StatusCode::CONFLICT, RosterMessages {
            error: Some(&message),
            ..Default::default()
        })
        .await;
    };
    db::audit::record(
        &state.pool,
        AuditEntry::new(Some(user.id), "create", "staff")
            .entity(id)
            .details(draft.name.as_str()),
    )
    .await?;
    Ok(Redirect::to("/admin/staff?notice=created").into_response())
}

/// Read the uploaded `file` field.
async fn upload_bytes(mut multipart: Multipart) -> Result<Option<Vec<u8>>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return Ok(Some(bytes.to_vec()));
        }
    }
    Ok(None)
}

async fn import(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let bytes = match upload_bytes(multipart).await? {
        Some(bytes) if !bytes.is_empty() => bytes,
        _ => {
            return render(&state, &user, StatusCode::BAD_REQUEST, RosterMessages {
                error: Some("Choose a CSV file to import."),
                ..Default::default()
            })
            .await;
        }
    };
    let parsed = match parse_roster(bytes.as_slice()) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::warn!(error = %err, "roster upload rejected");
            let message = err.to_string();
            return render(&state, &user, StatusCode::BAD_REQUEST, RosterMessages {
                error: Some(&message),
                ..Default::default()
            })
            .await;
        }
    };

    let summary = db::staff::import_roster(&state.pool, &parsed).await?;
    db::audit::record(
        &state.pool,
        AuditEntry::new(Some(user.id), "import", "staff").details(format!(
            "count={} duplicates={} skipped={}",
            summary.inserted, summary.duplicates, summary.skipped
        )),
    )
    .await?;
    Ok(Redirect::to(&format!(
        "/admin/staff?inserted={}&duplicates={}&skipped={}",
        summary.inserted, summary.duplicates, summary.skipped
    ))
    .into_response())
}

async fn toggle(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    if !db::staff::toggle_active(&state.pool, id).await? {
        return Ok(Redirect::to("/admin/staff").into_response());
    }
    let active = db::staff::get(&state.pool, id).await?.is_some_and(|s| s.active);
    db::audit::record(
        &state.pool,
        AuditEntry::new(Some(user.id), "toggle", "staff")
            .entity(id)
            .details(format!("active={}", u8::from(active))),
    )
    .await?;
    Ok(Redirect::to("/admin/staff?notice=toggled").into_response())
}
