//! Account administration.

use axum::extract::rejection::FormRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use soptrack_core::validation::{AdminPasswordInput, UserInput};

use super::admin::NoticeQuery;
use crate::auth::{self, AdminUser, CurrentUser};
use crate::db::{self, audit::AuditEntry};
use crate::error::AppError;
use crate::extractors::extract_form;
use crate::state::AppState;
use crate::views;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(index))
        .route("/admin/users/new", post(create))
        .route("/admin/users/:id/toggle", post(toggle))
        .route("/admin/users/:id/force-reset", post(force_reset))
        .route("/admin/users/:id/password", post(set_password))
}

async fn render(
    state: &AppState,
    user: &CurrentUser,
    status: StatusCode,
    notice: Option<&str>,
    error: Option<&str>,
) -> Result<Response, AppError> {
    let users = db::users::list(&state.pool).await?;
    let staff = db::staff::list(&state.pool).await?;
    let page = views::users::users_page(user, &users, &staff, notice, error);
    Ok((status, Html(page)).into_response())
}

async fn index(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Query(query): Query<NoticeQuery>,
) -> Result<Response, AppError> {
    render(&state, &user, StatusCode::OK, query.notice.as_deref(), None).await
}

async fn create(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    form: Result<Form<UserInput>, FormRejection>,
) -> Result<Response, AppError> {
    let input = extract_form(form)?;
    let draft = match input.validate() {
        Ok(draft) => draft,
        Err(err) => {
            let message = err.to_string();
            return render(&state, &user, StatusCode::UNPROCESSABLE_ENTITY, None, Some(&message))
                .await;
        }
    };
    if let Some(staff_id) = draft.staff_id {
        if db::staff::get(&state.pool, staff_id).await?.is_none() {
            return render(
                &state,
                &user,
                StatusCode::UNPROCESSABLE_ENTITY,
                None,
                Some("Selected staff member does not exist"),
            )
            .await;
        }
    }

    let created = auth::create_user(
        &state.pool,
        Some(user.id),
        &draft.username,
        &draft.password,
        draft.role,
        draft.staff_id,
        draft.must_reset_password,
    )
    .await?;
    if created.is_none() {
        return render(
            &state,
            &user,
            StatusCode::CONFLICT,
            None,
            Some("Username already exists"),
        )
        .await;
    }
    tracing::info!(actor = %user.username, username = %draft.username, role = draft.role.as_str(), "user created");
    Ok(Redirect::to("/admin/users?notice=created").into_response())
}

async fn toggle(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    if id == user.id {
        return render(
            &state,
            &user,
            StatusCode::UNPROCESSABLE_ENTITY,
            None,
            Some("You cannot deactivate your own account"),
        )
        .await;
    }
    if !db::users::toggle_active(&state.pool, id).await? {
        return Ok(Redirect::to("/admin/users").into_response());
    }
    let active = db::users::get(&state.pool, id).await?.is_some_and(|u| u.active);
    db::audit::record(
        &state.pool,
        AuditEntry::new(Some(user.id), "toggle", "user")
            .entity(id)
            .details(format!("active={}", u8::from(active))),
    )
    .await?;
    Ok(Redirect::to("/admin/users?notice=toggled").into_response())
}

async fn force_reset(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    if !db::users::require_reset(&state.pool, id).await? {
        return Ok(Redirect::to("/admin/users").into_response());
    }
    db::audit::record(
        &state.pool,
        AuditEntry::new(Some(user.id), "force_reset", "user")
            .entity(id)
            .details("must_reset_password=1"),
    )
    .await?;
    Ok(Redirect::to("/admin/users?notice=reset").into_response())
}

async fn set_password(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Path(id): Path<i64>,
    form: Result<Form<AdminPasswordInput>, FormRejection>,
) -> Result<Response, AppError> {
    let input = extract_form(form)?;
    if let Err(err) = input.validate() {
        let message = err.to_string();
        return render(&state, &user, StatusCode::UNPROCESSABLE_ENTITY, None, Some(&message)).await;
    }
    let hash = auth::hash(&input.new_password).await?;
    if !db::users::set_password(&state.pool, id, &hash, true).await? {
        return Ok(Redirect::to("/admin/users").into_response());
    }
    db::audit::record(
        &state.pool,
        AuditEntry::new(Some(user.id), "password_reset", "user")
            .entity(id)
            .details("admin reset"),
    )
    .await?;
    Ok(Redirect::to("/admin/users?notice=password").into_response())
}
