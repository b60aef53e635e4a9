//! Login, logout, and self-service password change.

use axum::extract::rejection::FormRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use serde::Deserialize;
use soptrack_core::validation::PasswordChangeInput;

use crate::auth::{self, CurrentUser};
use crate::db::{self, audit::AuditEntry};
use crate::error::AppError;
use crate::extractors::extract_form;
use crate::session;
use crate::state::AppState;
use crate::views;

#[derive(Debug, Deserialize)]
struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Default, Deserialize)]
struct AccountQuery {
    force: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_form).post(login))
        .route("/logout", post(logout))
        .route("/account", get(account).post(change_password))
}

async fn login_form(user: Option<CurrentUser>) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    Html(views::session::login_page(None, "")).into_response()
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Response, AppError> {
    let form = extract_form(form)?;
    let Some(user) = auth::authenticate(&state.pool, &form.username, &form.password).await? else {
        tracing::warn!(username = %form.username.trim(), "login failed");
        let page = views::session::login_page(Some("Invalid credentials"), form.username.trim());
        return Ok((StatusCode::UNAUTHORIZED, Html(page)).into_response());
    };

    let jar = session::start(
        jar,
        user.id,
        state.config.session_secret.expose().as_bytes(),
        Utc::now().timestamp(),
    )
    .map_err(|e| AppError::Internal(e.to_string()))?;
    tracing::info!(user = %user.username, "signed in");

    let target = if user.must_reset_password {
        "/account?force=1"
    } else {
        "/"
    };
    Ok((jar, Redirect::to(target)).into_response())
}

async fn logout(jar: CookieJar) -> impl IntoResponse {
    (session::end(jar), Redirect::to("/login"))
}

async fn account(user: CurrentUser, Query(query): Query<AccountQuery>) -> Html<String> {
    Html(views::session::account_page(
        &user,
        query.force.is_some(),
        None,
        None,
    ))
}

async fn change_password(
    State(state): State<AppState>,
    user: CurrentUser,
    form: Result<Form<PasswordChangeInput>, FormRejection>,
) -> Result<Response, AppError> {
    let form = extract_form(form)?;
    let reject = |message: &str| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Html(views::session::account_page(&user, false, Some(message), None)),
        )
            .into_response()
    };

    if let Err(err) = form.validate() {
        return Ok(reject(&err.to_string()));
    }
    let Some(record) = db::users::get(&state.pool, user.id).await? else {
        return Err(AppError::Unauthorized("user vanished".into()));
    };
    if !auth::check_password(&form.current_password, &record.password_hash).await? {
        return Ok(reject("Current password is incorrect"));
    }

    let hash = auth::hash(&form.new_password).await?;
    db::users::set_password(&state.pool, user.id, &hash, false).await?;
    db::audit::record(
        &state.pool,
        AuditEntry::new(Some(user.id), "password_change", "user")
            .entity(user.id)
            .details("self-service"),
    )
    .await?;

    let user = CurrentUser {
        must_reset_password: false,
        ..user
    };
    Ok(Html(views::session::account_page(
        &user,
        false,
        None,
        Some("Password updated."),
    ))
    .into_response())
}
