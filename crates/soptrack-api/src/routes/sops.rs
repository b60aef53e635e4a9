//! SOP browser, detail, print, and acknowledgment.

use axum::extract::rejection::FormRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use soptrack_core::reack_cutoff;
use soptrack_core::validation::AckInput;

use crate::auth::CurrentUser;
use crate::db::{self, acknowledgments::AckEvidence, acknowledgments::AckOutcome, audit::AuditEntry};
use crate::error::AppError;
use crate::extractors::{extract_form, ClientInfo};
use crate::state::AppState;
use crate::views::{self, sops::BrowseQuery, sops::DetailPage};

#[derive(Debug, Default, Deserialize)]
struct BrowseParams {
    q: Option<String>,
    category: Option<String>,
}

impl BrowseParams {
    fn q(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    /// `All` and blank mean no category filter.
    fn category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && *c != "All")
    }
}

#[derive(Debug, Default, Deserialize)]
struct DetailParams {
    q: Option<String>,
    notice: Option<String>,
}

/// Acknowledgments taken before this day have expired.
fn ack_cutoff(state: &AppState) -> NaiveDate {
    reack_cutoff(Utc::now().date_naive(), state.config.reack_days)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/sop/:id", get(detail))
        .route("/sop/:id/print", get(print))
        .route("/sop/:id/ack", post(acknowledge))
}

async fn index(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<BrowseParams>,
) -> Result<Html<String>, AppError> {
    let sops = db::sops::search(&state.pool, params.q(), params.category()).await?;
    let categories = db::sops::categories(&state.pool).await?;
    let grouped = db::sops::group_by_category(sops);
    Ok(Html(views::sops::index_page(
        &user,
        BrowseQuery {
            q: params.q(),
            category: params.category(),
        },
        &categories,
        &grouped,
    )))
}

/// Render the detail page, or `None` when the SOP does not exist.
async fn render_detail(
    state: &AppState,
    user: &CurrentUser,
    id: i64,
    query: Option<&str>,
    notice: Option<&str>,
    error: Option<&str>,
) -> Result<Option<String>, AppError> {
    let Some(sop) = db::sops::get(&state.pool, id).await? else {
        return Ok(None);
    };
    let mut acknowledgments = db::acknowledgments::for_sop(&state.pool, id).await?;
    if !user.can_view_compliance() {
        acknowledgments.retain(|a| Some(a.staff_id) == user.staff_id);
    }
    let acknowledged_current = match user.staff_id {
        Some(staff_id) => {
            db::acknowledgments::has_acknowledged(
                &state.pool,
                id,
                staff_id,
                sop.current_version,
                ack_cutoff(state),
            )
            .await?
        }
        None => false,
    };
    Ok(Some(views::sops::detail_page(
        user,
        &DetailPage {
            sop: &sop,
            acknowledgments: &acknowledgments,
            acknowledged_current,
            min_read_seconds: state.config.min_read_seconds,
            query,
            notice,
            error,
        },
    )))
}

async fn detail(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Query(params): Query<DetailParams>,
) -> Result<Response, AppError> {
    let page = render_detail(
        &state,
        &user,
        id,
        params.q.as_deref(),
        params.notice.as_deref(),
        None,
    )
    .await?;
    Ok(match page {
        Some(page) => Html(page).into_response(),
        None => Redirect::to("/").into_response(),
    })
}

async fn print(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    Ok(match db::sops::get(&state.pool, id).await? {
        Some(sop) => Html(views::sops::print_page(&sop)).into_response(),
        None => Redirect::to("/").into_response(),
    })
}

async fn acknowledge(
    State(state): State<AppState>,
    user: CurrentUser,
    client: ClientInfo,
    Path(id): Path<i64>,
    form: Result<Form<AckInput>, FormRejection>,
) -> Result<Response, AppError> {
    let form = extract_form(form)?;
    let back = format!("/sop/{id}");
    let Some(staff_id) = user.staff_id else {
        tracing::warn!(user = %user.username, sop = id, "acknowledgment without staff link");
        return Ok(Redirect::to(&back).into_response());
    };

    let draft = match form.validate(state.config.min_read_seconds) {
        Ok(draft) => draft,
        Err(err) => {
            let message = err.to_string();
            return Ok(
                match render_detail(&state, &user, id, None, None, Some(&message)).await? {
                    Some(page) => (StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response(),
                    None => Redirect::to("/").into_response(),
                },
            );
        }
    };

    let evidence = AckEvidence {
        ip_address: client.ip_address.as_deref(),
        user_agent: client.user_agent.as_deref(),
    };
    let outcome = db::acknowledgments::record(
        &state.pool,
        id,
        staff_id,
        &draft,
        &evidence,
        ack_cutoff(&state),
    )
    .await?;
    let notice = match outcome {
        AckOutcome::SopMissing => return Ok(Redirect::to("/").into_response()),
        AckOutcome::AlreadyAcknowledged { .. } => "already",
        AckOutcome::Recorded { version } => {
            db::audit::record(
                &state.pool,
                AuditEntry::new(Some(user.id), "acknowledged", "sop")
                    .entity(id)
                    .details(format!("version={version} signature={}", draft.signature_text)),
            )
            .await?;
            "acknowledged"
        }
    };
    Ok(Redirect::to(&format!("{back}?notice={notice}")).into_response())
}
