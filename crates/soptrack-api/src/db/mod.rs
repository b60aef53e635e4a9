//! # Database Persistence Layer
//!
//! SQLite via sqlx. Every module exposes free `async fn`s over a pool, an
//! executor, or an open transaction; handlers never write SQL.
//!
//! The database file (and its parent directory) is created when missing.
//! Connections run with `foreign_keys = ON` and the WAL journal, and the
//! embedded migrations in `migrations/` are applied on connect.

pub mod acknowledgments;
pub mod audit;
pub mod compliance;
pub mod sops;
pub mod staff;
pub mod users;

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

/// Connect to `url`, creating the file if needed, and run migrations.
///
/// `sqlite::memory:` is supported for tests; pass `max_connections = 1`
/// so that every query sees the same in-memory database.
pub async fn connect(url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    if let Some(parent) = options.get_filename().parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .idle_timeout(None)
        .max_lifetime(None)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await?;

    tracing::info!(%url, "connected to SQLite");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database migrations applied");

    Ok(pool)
}

/// Map a unique-constraint violation to `Ok(None)`, pass anything else on.
pub(crate) fn unique_violation_as_none<T>(
    result: Result<T, sqlx::Error>,
) -> Result<Option<T>, sqlx::Error> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Ok(None),
        Err(other) => Err(other),
    }
}
