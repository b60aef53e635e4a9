//! # soptrack-cli: Operator CLI for SOPTrack
//!
//! Provides the `soptrack` command for work done outside the browser,
//! against the same SQLite database the web application uses.
//!
//! ## Subcommands
//!
//! - `soptrack import-sops`: import a directory of `.txt` / `.md` SOPs.
//! - `soptrack import-staff`: import a roster CSV.
//! - `soptrack create-user`: create a login account.
//! - `soptrack export`: write an acknowledgment, SOP, or audit CSV.
//! - `soptrack compliance`: print the compliance report for a window.
//!
//! ```bash
//! soptrack --database-url sqlite://instance/sops.db import-sops ./policies
//! soptrack import-staff roster.csv
//! soptrack compliance --start-date 2025-01-01 --format csv
//! ```
//!
//! Each `run_*` function writes its report to the given writer and returns
//! the process exit code.

pub mod accounts;
pub mod compliance;
pub mod export;
pub mod import;

use anyhow::{Context, Result};
use sqlx::SqlitePool;

/// Open the application database, applying migrations.
pub async fn open_database(url: &str) -> Result<SqlitePool> {
    soptrack_api::db::connect(url, 1)
        .await
        .with_context(|| format!("opening database {url}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_database_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sops.db");
        let url = format!("sqlite://{}", path.display());
        let pool = open_database(&url).await.unwrap();
        assert_eq!(soptrack_api::db::sops::count(&pool).await.unwrap(), 0);
        assert!(path.exists());
    }
}
