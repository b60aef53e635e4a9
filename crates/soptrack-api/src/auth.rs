//! # Authentication & Authorization
//!
//! Cookie sessions with role-based access control.
//!
//! [`session_middleware`] runs on every request. It verifies the session
//! cookie, re-reads the user row, and injects a [`CurrentUser`] into the
//! request extensions when the user exists and is active. It never rejects
//! a request itself; handlers state what they need through extractors:
//!
//! | Extractor             | Requirement                                   |
//! |-----------------------|-----------------------------------------------|
//! | [`CurrentUser`]       | any signed-in user                            |
//! | [`ComplianceViewer`]  | role `training_lead` or higher                |
//! | [`AdminUser`]         | role `admin`                                  |
//!
//! A missing identity redirects to `/login`; an insufficient role is a 403
//! page. A user with a pending password reset is redirected to
//! `/account?force=1` from every page except the account and logout pages.

use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use soptrack_core::password::{hash_password, verify_password};
use soptrack_core::validation::StaffDraft;
use soptrack_core::Role;
use sqlx::SqlitePool;

use crate::config::AppConfig;
use crate::db::{self, audit::AuditEntry, users::NewUser, users::UserRecord};
use crate::error::AppError;
use crate::session::{self, SESSION_COOKIE};
use crate::state::AppState;

/// Paths a user with a pending reset may still visit.
const RESET_ALLOWED: &[&str] = &["/account", "/logout", "/login"];

// ── Identity ────────────────────────────────────────────────────────────────

/// The signed-in user, re-read from the database on every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub staff_id: Option<i64>,
    pub must_reset_password: bool,
}

impl CurrentUser {
    pub fn has_role(&self, minimum: Role) -> bool {
        self.role >= minimum
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn can_view_compliance(&self) -> bool {
        self.role.can_view_compliance()
    }
}

impl From<UserRecord> for CurrentUser {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            staff_id: user.staff_id,
            must_reset_password: user.must_reset_password,
        }
    }
}

#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no session".into()))
    }
}

/// Check that the user has at least the required role.
pub fn require_role(user: &CurrentUser, minimum: Role) -> Result<(), AppError> {
    if user.has_role(minimum) {
        Ok(())
    } else {
        tracing::warn!(
            user = %user.username,
            role = user.role.as_str(),
            required = minimum.as_str(),
            "access denied"
        );
        Err(AppError::Forbidden(format!(
            "This page requires the {} role.",
            minimum.label()
        )))
    }
}

/// A signed-in administrator.
#[derive(Debug, Clone)]
pub struct AdminUser(pub CurrentUser);

#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        require_role(&user, Role::Admin)?;
        Ok(Self(user))
    }
}

/// A signed-in user allowed to see compliance data.
#[derive(Debug, Clone)]
pub struct ComplianceViewer(pub CurrentUser);

#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for ComplianceViewer {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        require_role(&user, Role::TrainingLead)?;
        Ok(Self(user))
    }
}

// ── Middleware ──────────────────────────────────────────────────────────────

async fn resolve_session(state: &AppState, jar: &CookieJar) -> Option<CurrentUser> {
    let token = jar.get(SESSION_COOKIE)?.value().to_owned();
    let ttl = i64::from(state.config.session_ttl_hours) * 3600;
    let claims = match session::decode(
        &token,
        state.config.session_secret.expose().as_bytes(),
        Utc::now().timestamp(),
        ttl,
    ) {
        Ok(claims) => claims,
        Err(err) => {
            tracing::debug!(error = %err, "ignoring session cookie");
            return None;
        }
    };
    match db::users::get(&state.pool, claims.user_id).await {
        Ok(Some(user)) if user.active => Some(user.into()),
        Ok(_) => None,
        Err(err) => {
            tracing::error!(error = %err, "session user lookup failed");
            None
        }
    }
}

/// Attach the session's [`CurrentUser`] to the request, if any.
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(user) = resolve_session(&state, &jar).await {
        let path = request.uri().path();
        if user.must_reset_password && !RESET_ALLOWED.contains(&path) {
            return Redirect::to("/account?force=1").into_response();
        }
        request.extensions_mut().insert(user);
    }
    next.run(request).await
}

// ── Credentials ─────────────────────────────────────────────────────────────

/// Verify a password off the async runtime.
pub async fn check_password(password: &str, stored_hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let stored_hash = stored_hash.to_owned();
    let verified = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| AppError::Internal(format!("password check task: {e}")))?;
    match verified {
        Ok(ok) => Ok(ok),
        Err(err) => {
            tracing::warn!(error = %err, "stored password hash is unreadable");
            Ok(false)
        }
    }
}

/// Hash a password off the async runtime.
pub async fn hash(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("password hash task: {e}")))
}

/// Look up an active user by username and check the password.
pub async fn authenticate(
    pool: &SqlitePool,
    username: &str,
    password: &str,
) -> Result<Option<UserRecord>, AppError> {
    let username = username.trim().to_lowercase();
    let Some(user) = db::users::find_by_username(pool, &username).await? else {
        return Ok(None);
    };
    if !user.active || !check_password(password, &user.password_hash).await? {
        return Ok(None);
    }
    Ok(Some(user))
}

/// Create a user, linking staff-role accounts to a roster row.
///
/// A `staff` account without an explicit `staff_id` gets a roster entry
/// named after the username. Returns `None` when the username is taken.
pub async fn create_user(
    pool: &SqlitePool,
    actor: Option<i64>,
    username: &str,
    password: &str,
    role: Role,
    staff_id: Option<i64>,
    must_reset_password: bool,
) -> Result<Option<i64>, AppError> {
    let password_hash = hash(password).await?;
    let mut tx = pool.begin().await?;
    let staff_id = match (role, staff_id) {
        (Role::Staff, None) => {
            let draft = StaffDraft::from_name(username)?;
            Some(db::staff::find_or_create(&mut tx, &draft).await?)
        }
        (_, linked) => linked,
    };
    let new_user = NewUser {
        username,
        password_hash: &password_hash,
        role,
        staff_id,
        must_reset_password,
    };
    let Some(id) = db::users::insert(&mut *tx, &new_user).await? else {
        return Ok(None);
    };
    db::audit::record(
        &mut *tx,
        AuditEntry::new(actor, "create", "user").entity(id).details(username),
    )
    .await?;
    tx.commit().await?;
    Ok(Some(id))
}

/// Create the configured admin account unless the username exists.
///
/// Returns whether an account was created.
pub async fn ensure_default_admin(pool: &SqlitePool, config: &AppConfig) -> Result<bool, AppError> {
    let username = config.admin_username.trim().to_lowercase();
    if db::users::find_by_username(pool, &username).await?.is_some() {
        return Ok(false);
    }
    let created = create_user(
        pool,
        None,
        &username,
        config.admin_password.expose(),
        Role::Admin,
        None,
        false,
    )
    .await?;
    if created.is_some() {
        tracing::info!(%username, "created default admin account");
    }
    Ok(created.is_some())
}
