//! SOP administration: list, create, edit, and evidence.

use axum::extract::rejection::FormRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use serde::Deserialize;
use soptrack_core::validation::SopInput;

use crate::auth::AdminUser;
use crate::db::{self, audit::AuditEntry};
use crate::error::AppError;
use crate::extractors::extract_form;
use crate::state::AppState;
use crate::views::{self, admin::SopForm};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NoticeQuery {
    pub notice: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin", get(index))
        .route("/admin/new", get(new_form).post(create))
        .route("/admin/edit/:id", get(edit_form).post(update))
        .route("/admin/evidence/sop/:id", get(evidence))
}

async fn index(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Query(query): Query<NoticeQuery>,
) -> Result<Html<String>, AppError> {
    let sops = db::sops::list_recent(&state.pool).await?;
    Ok(Html(views::admin::index_page(&user, &sops, query.notice.as_deref())))
}

async fn new_form(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
) -> Result<Html<String>, AppError> {
    let categories = db::sops::categories(&state.pool).await?;
    Ok(Html(views::admin::sop_form_page(
        &user,
        None,
        &SopForm::default(),
        &categories,
        None,
    )))
}

fn form_values(input: &SopInput) -> SopForm {
    SopForm {
        title: input.title.clone(),
        category: input.category.clone(),
        content: input.content.clone(),
    }
}

async fn create(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    form: Result<Form<SopInput>, FormRejection>,
) -> Result<Response, AppError> {
    let input = extract_form(form)?;
    let draft = match input.validate() {
        Ok(draft) => draft,
        Err(err) => {
            let categories = db::sops::categories(&state.pool).await?;
            let page = views::admin::sop_form_page(
                &user,
                None,
                &form_values(&input),
                &categories,
                Some(&err.to_string()),
            );
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response());
        }
    };

    let id = db::sops::create(&state.pool, &draft, Some(user.id)).await?;
    db::audit::record(
        &state.pool,
        AuditEntry::new(Some(user.id), "create", "sop")
            .entity(id)
            .details(draft.title.as_str()),
    )
    .await?;
    Ok(Redirect::to("/admin?notice=created").into_response())
}

async fn edit_form(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let Some(sop) = db::sops::get(&state.pool, id).await? else {
        return Ok(Redirect::to("/admin").into_response());
    };
    let categories = db::sops::categories(&state.pool).await?;
    Ok(Html(views::admin::sop_form_page(
        &user,
        Some((sop.id, sop.current_version)),
        &SopForm::from(&sop),
        &categories,
        None,
    ))
    .into_response())
}

async fn update(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Path(id): Path<i64>,
    form: Result<Form<SopInput>, FormRejection>,
) -> Result<Response, AppError> {
    let input = extract_form(form)?;
    let Some(sop) = db::sops::get(&state.pool, id).await? else {
        return Ok(Redirect::to("/admin").into_response());
    };
    let draft = match input.validate() {
        Ok(draft) => draft,
        Err(err) => {
            let categories = db::sops::categories(&state.pool).await?;
            let page = views::admin::sop_form_page(
                &user,
                Some((sop.id, sop.current_version)),
                &form_values(&input),
                &categories,
                Some(&err.to_string()),
            );
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response());
        }
    };

    let Some(version) = db::sops::update(&state.pool, id, &draft, Some(user.id)).await? else {
        return Ok(Redirect::to("/admin").into_response());
    };
    db::audit::record(
        &state.pool,
        AuditEntry::new(Some(user.id), "update", "sop")
            .entity(id)
            .details(format!("version={version}")),
    )
    .await?;
    Ok(Redirect::to("/admin?notice=updated").into_response())
}

async fn evidence(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let Some(sop) = db::sops::get(&state.pool, id).await? else {
        return Ok(Redirect::to("/admin").into_response());
    };
    let versions = db::sops::versions(&state.pool, id).await?;
    let acks = db::acknowledgments::for_sop(&state.pool, id).await?;
    Ok(Html(views::admin::evidence_page(&user, &sop, &versions, &acks)).into_response())
}
