//! # Account Commands
//!
//! `create-user` applies the same rules as the admin users page: username
//! format, password policy, and staff accounts starting with a pending
//! reset.

use std::io::Write;

use anyhow::{bail, Result};
use clap::Args;
use soptrack_api::{auth, db};
use soptrack_core::validation::UserInput;
use sqlx::SqlitePool;

/// Arguments for `soptrack create-user`.
#[derive(Args, Debug)]
pub struct CreateUserArgs {
    #[arg(long)]
    pub username: String,

    /// Initial password.
    #[arg(long, env = "SOPTRACK_NEW_USER_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// One of staff, training_lead, hr_manager, manager, admin.
    #[arg(long, default_value = "staff")]
    pub role: String,

    /// Roster id to link. Staff accounts without one get a roster entry.
    #[arg(long)]
    pub staff_id: Option<i64>,

    /// Require a password change at first login.
    #[arg(long)]
    pub must_reset: bool,
}

pub async fn run_create_user(
    args: &CreateUserArgs,
    pool: &SqlitePool,
    out: &mut impl Write,
) -> Result<u8> {
    let input = UserInput {
        username: args.username.clone(),
        password: args.password.clone(),
        role: args.role.clone(),
        staff_id: args.staff_id.map(|id| id.to_string()),
        must_reset_password: args.must_reset.then(|| "on".to_string()),
    };
    let draft = input.validate()?;
    if let Some(staff_id) = draft.staff_id {
        if db::staff::get(pool, staff_id).await?.is_none() {
            bail!("staff member {staff_id} does not exist");
        }
    }

    let created = auth::create_user(
        pool,
        None,
        &draft.username,
        &draft.password,
        draft.role,
        draft.staff_id,
        draft.must_reset_password,
    )
    .await?;
    let Some(id) = created else {
        writeln!(out, "Username already exists: {}", draft.username)?;
        return Ok(1);
    };
    writeln!(
        out,
        "Created user {} (id {id}, role {})",
        draft.username,
        draft.role.as_str()
    )?;
    Ok(0)
}
