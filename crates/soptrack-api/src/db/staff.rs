//! Staff roster persistence.
//!
//! A staff member's identity is `normalized_name`; inserting a name that
//! normalizes to an existing row is a no-op, never an error.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use soptrack_core::roster::RosterParse;
use soptrack_core::validation::StaffDraft;
use soptrack_core::StaffRef;
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};

/// A roster row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StaffRecord {
    pub id: i64,
    pub name: String,
    pub normalized_name: String,
    pub staff_type: Option<String>,
    pub job_title: Option<String>,
    pub department: Option<String>,
    pub supervisor: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub active: bool,
    pub created_at: NaiveDateTime,
}

/// Counts reported after a roster import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RosterImportSummary {
    pub inserted: u64,
    pub duplicates: u64,
    pub skipped: u64,
}

const COLUMNS: &str = "id, name, normalized_name, staff_type, job_title, department, supervisor,
     hire_date, active, created_at";

/// Insert a staff member unless one with the same normalized name exists.
///
/// Returns the new id, or `None` for a duplicate.
pub async fn insert(
    executor: impl SqliteExecutor<'_>,
    draft: &StaffDraft,
) -> Result<Option<i64>, sqlx::Error> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO staff
            (name, normalized_name, staff_type, job_title, department, supervisor, hire_date)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&draft.name)
    .bind(&draft.normalized_name)
    .bind(&draft.staff_type)
    .bind(&draft.job_title)
    .bind(&draft.department)
    .bind(&draft.supervisor)
    .bind(draft.hire_date)
    .execute(executor)
    .await?;

    Ok((result.rows_affected() > 0).then(|| result.last_insert_rowid()))
}

/// Id of the staff member with `draft`'s normalized name, inserting it
/// first when absent.
pub async fn find_or_create(
    conn: &mut SqliteConnection,
    draft: &StaffDraft,
) -> Result<i64, sqlx::Error> {
    if let Some(id) = insert(&mut *conn, draft).await? {
        return Ok(id);
    }
    sqlx::query_scalar("SELECT id FROM staff WHERE normalized_name = ?")
        .bind(&draft.normalized_name)
        .fetch_one(&mut *conn)
        .await
}

/// Insert every parsed roster entry in one transaction.
pub async fn import_roster(
    pool: &SqlitePool,
    parsed: &RosterParse,
) -> Result<RosterImportSummary, sqlx::Error> {
    let mut summary = RosterImportSummary {
        skipped: parsed.skipped.len() as u64,
        ..Default::default()
    };
    for row in &parsed.skipped {
        tracing::warn!(line = row.line, reason = %row.reason, "skipping roster row");
    }

    let mut tx = pool.begin().await?;
    for entry in &parsed.entries {
        match insert(&mut *tx, entry).await? {
            Some(_) => summary.inserted += 1,
            None => summary.duplicates += 1,
        }
    }
    tx.commit().await?;

    tracing::info!(
        inserted = summary.inserted,
        duplicates = summary.duplicates,
        skipped = summary.skipped,
        "roster imported"
    );
    Ok(summary)
}

/// Full roster, active members first.
pub async fn list(pool: &SqlitePool) -> Result<Vec<StaffRecord>, sqlx::Error> {
    sqlx::query_as::<_, StaffRecord>(&format!(
        "SELECT {COLUMNS} FROM staff ORDER BY active DESC, name"
    ))
    .fetch_all(pool)
    .await
}

/// Active staff, by name. These are the people compliance is measured over.
pub async fn active_refs(pool: &SqlitePool) -> Result<Vec<StaffRef>, sqlx::Error> {
    let rows: Vec<(i64, String)> =
        sqlx::query_as("SELECT id, name FROM staff WHERE active = 1 ORDER BY name")
            .fetch_all(pool)
            .await?;
    Ok(rows
        .into_iter()
        .map(|(id, name)| StaffRef { id, name })
        .collect())
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<StaffRecord>, sqlx::Error> {
    sqlx::query_as::<_, StaffRecord>(&format!("SELECT {COLUMNS} FROM staff WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Flip `active`. Returns `false` when no such row exists.
pub async fn toggle_active(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE staff SET active = CASE WHEN active = 1 THEN 0 ELSE 1 END WHERE id = ?",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
