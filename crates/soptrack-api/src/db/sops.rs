//! SOP and version history persistence.
//!
//! `sops.current_version` always equals the highest `sop_versions.version`
//! of that SOP: create writes version 1 and every content change writes
//! `current_version + 1`, each inside one transaction together with the
//! `sops` row.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;
use soptrack_core::document::{clean_title, SopDocument};
use soptrack_core::validation::SopDraft;
use soptrack_core::SopRef;
use sqlx::{SqliteConnection, SqlitePool};
use utoipa::ToSchema;

/// A full SOP row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SopRecord {
    pub id: i64,
    pub title: String,
    pub category: String,
    pub content: String,
    pub content_clean: Option<String>,
    pub last_reviewed: Option<String>,
    pub source_file: Option<String>,
    pub current_version: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl SopRecord {
    /// Text shown to readers: header-stripped when available.
    pub fn display_content(&self) -> &str {
        self.content_clean
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(&self.content)
    }
}

/// List row without content.
#[derive(Debug, Clone, Serialize, ToSchema, sqlx::FromRow)]
pub struct SopSummary {
    pub id: i64,
    pub title: String,
    pub category: String,
    pub current_version: i64,
    #[schema(value_type = String)]
    pub updated_at: NaiveDateTime,
}

/// One entry of an SOP's version history.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SopVersionRecord {
    pub version: i64,
    pub title: String,
    pub category: String,
    pub created_at: NaiveDateTime,
    pub created_by: Option<String>,
}

/// Result of importing one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted { id: i64 },
    NewVersion { id: i64, version: i64 },
    Unchanged { id: i64 },
}

const COLUMNS: &str = "id, title, category, content, content_clean, last_reviewed, source_file,
     current_version, created_at, updated_at";

fn like_pattern(query: &str) -> String {
    let escaped = query
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// SOPs matching an optional case-insensitive text query (title or
/// content) and an optional exact category, by title.
pub async fn search(
    pool: &SqlitePool,
    query: Option<&str>,
    category: Option<&str>,
) -> Result<Vec<SopSummary>, sqlx::Error> {
    let pattern = query.map(str::trim).filter(|q| !q.is_empty()).map(like_pattern);
    sqlx::query_as::<_, SopSummary>(
        "SELECT id, title, category, current_version, updated_at FROM sops
         WHERE (?1 IS NULL OR lower(title) LIKE ?1 ESCAPE '\\' OR lower(content) LIKE ?1 ESCAPE '\\')
           AND (?2 IS NULL OR category = ?2)
         ORDER BY title",
    )
    .bind(pattern)
    .bind(category)
    .fetch_all(pool)
    .await
}

/// Search results grouped by category, categories in name order.
pub fn group_by_category(sops: Vec<SopSummary>) -> BTreeMap<String, Vec<SopSummary>> {
    let mut grouped: BTreeMap<String, Vec<SopSummary>> = BTreeMap::new();
    for sop in sops {
        grouped.entry(sop.category.clone()).or_default().push(sop);
    }
    grouped
}

pub async fn categories(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT DISTINCT category FROM sops ORDER BY category")
        .fetch_all(pool)
        .await
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<SopRecord>, sqlx::Error> {
    sqlx::query_as::<_, SopRecord>(&format!("SELECT {COLUMNS} FROM sops WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// All SOPs, most recently updated first.
pub async fn list_recent(pool: &SqlitePool) -> Result<Vec<SopSummary>, sqlx::Error> {
    sqlx::query_as::<_, SopSummary>(
        "SELECT id, title, category, current_version, updated_at FROM sops
         ORDER BY updated_at DESC, id DESC",
    )
    .fetch_all(pool)
    .await
}

/// All SOPs by title.
pub async fn list_by_title(pool: &SqlitePool) -> Result<Vec<SopSummary>, sqlx::Error> {
    search(pool, None, None).await
}

/// Aggregation inputs for the compliance report, by title.
pub async fn refs(pool: &SqlitePool) -> Result<Vec<SopRef>, sqlx::Error> {
    let rows: Vec<(i64, String, String, i64)> =
        sqlx::query_as("SELECT id, title, category, current_version FROM sops ORDER BY title")
            .fetch_all(pool)
            .await?;
    Ok(rows
        .into_iter()
        .map(|(id, title, category, current_version)| SopRef {
            id,
            title,
            category,
            current_version,
        })
        .collect())
}

pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM sops")
        .fetch_one(pool)
        .await
}

async fn insert_version(
    conn: &mut SqliteConnection,
    sop_id: i64,
    version: i64,
    draft: &SopDraft,
    created_by: Option<i64>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO sop_versions (sop_id, version, title, category, content, created_by)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(sop_id)
    .bind(version)
    .bind(&draft.title)
    .bind(&draft.category)
    .bind(&draft.content)
    .bind(created_by)
    .execute(conn)
    .await?;
    Ok(())
}

/// Create an SOP at version 1.
pub async fn create(
    pool: &SqlitePool,
    draft: &SopDraft,
    created_by: Option<i64>,
) -> Result<i64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let id = sqlx::query("INSERT INTO sops (title, category, content) VALUES (?, ?, ?)")
        .bind(&draft.title)
        .bind(&draft.category)
        .bind(&draft.content)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
    insert_version(&mut tx, id, 1, draft, created_by).await?;
    tx.commit().await?;
    Ok(id)
}

/// Replace an SOP's content as a new version.
///
/// Returns the new version number, or `None` when the SOP does not exist.
pub async fn update(
    pool: &SqlitePool,
    id: i64,
    draft: &SopDraft,
    updated_by: Option<i64>,
) -> Result<Option<i64>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let version = bump_version(&mut tx, id, draft, updated_by).await?;
    tx.commit().await?;
    Ok(version)
}

async fn bump_version(
    conn: &mut SqliteConnection,
    id: i64,
    draft: &SopDraft,
    updated_by: Option<i64>,
) -> Result<Option<i64>, sqlx::Error> {
    let Some(current): Option<i64> =
        sqlx::query_scalar("SELECT current_version FROM sops WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
    else {
        return Ok(None);
    };
    let next = current + 1;
    sqlx::query(
        "UPDATE sops
         SET title = ?, category = ?, content = ?, current_version = ?,
             updated_at = datetime('now')
         WHERE id = ?",
    )
    .bind(&draft.title)
    .bind(&draft.category)
    .bind(&draft.content)
    .bind(next)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    insert_version(conn, id, next, draft, updated_by).await?;
    Ok(Some(next))
}

/// Version history, newest first.
pub async fn versions(pool: &SqlitePool, id: i64) -> Result<Vec<SopVersionRecord>, sqlx::Error> {
    sqlx::query_as::<_, SopVersionRecord>(
        "SELECT sop_versions.version, sop_versions.title, sop_versions.category,
                sop_versions.created_at, users.username AS created_by
         FROM sop_versions LEFT JOIN users ON users.id = sop_versions.created_by
         WHERE sop_versions.sop_id = ?
         ORDER BY sop_versions.version DESC",
    )
    .bind(id)
    .fetch_all(pool)
    .await
}

/// Insert or refresh an SOP from an imported document, matched by title.
///
/// Changed content becomes a new version; identical content only refreshes
/// the document metadata.
pub async fn upsert_document(
    conn: &mut SqliteConnection,
    doc: &SopDocument,
    source_file: &str,
) -> Result<UpsertOutcome, sqlx::Error> {
    let existing: Option<(i64, String)> =
        sqlx::query_as("SELECT id, content FROM sops WHERE title = ? ORDER BY id LIMIT 1")
            .bind(&doc.title)
            .fetch_optional(&mut *conn)
            .await?;

    let draft = SopDraft {
        title: doc.title.clone(),
        category: doc.category.clone(),
        content: doc.content.clone(),
    };

    let (id, outcome) = match existing {
        Some((id, content)) if content == doc.content => (id, UpsertOutcome::Unchanged { id }),
        Some((id, _)) => match bump_version(conn, id, &draft, None).await? {
            Some(version) => (id, UpsertOutcome::NewVersion { id, version }),
            None => (id, UpsertOutcome::Unchanged { id }),
        },
        None => {
            let id = sqlx::query("INSERT INTO sops (title, category, content) VALUES (?, ?, ?)")
                .bind(&draft.title)
                .bind(&draft.category)
                .bind(&draft.content)
                .execute(&mut *conn)
                .await?
                .last_insert_rowid();
            insert_version(conn, id, 1, &draft, None).await?;
            (id, UpsertOutcome::Inserted { id })
        }
    };

    sqlx::query(
        "UPDATE sops SET category = ?, content_clean = ?, last_reviewed = ?, source_file = ?
         WHERE id = ?",
    )
    .bind(&doc.category)
    .bind(&doc.content_clean)
    .bind(&doc.last_reviewed)
    .bind(source_file)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(outcome)
}

/// Result of [`dedupe_by_title`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    /// Duplicate SOP rows deleted.
    pub removed: u64,
    /// Acknowledgments moved onto the kept row.
    pub moved_acks: u64,
    /// Acknowledgments of versions the kept row never had, deleted with
    /// their SOP.
    pub discarded_acks: u64,
}

/// Merge SOPs whose titles clean to the same text into the lowest id.
///
/// An acknowledgment of a dropped row moves to the kept row only when the
/// kept row has the same version number with identical content. Other
/// acknowledgments are deleted and counted in
/// [`MergeSummary::discarded_acks`]. A moved
/// acknowledgment that the kept row already holds for the same staff
/// member is dropped as a duplicate.
pub async fn dedupe_by_title(conn: &mut SqliteConnection) -> Result<MergeSummary, sqlx::Error> {
    let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, title FROM sops ORDER BY id")
        .fetch_all(&mut *conn)
        .await?;

    let mut groups: BTreeMap<String, Vec<i64>> = BTreeMap::new();
    for (id, title) in rows {
        groups.entry(clean_title(&title).to_lowercase()).or_default().push(id);
    }

    let mut summary = MergeSummary::default();
    for ids in groups.into_values().filter(|ids| ids.len() > 1) {
        let keep = ids[0];
        for &drop in &ids[1..] {
            let discarded: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM acknowledgments a
                 WHERE a.sop_id = ?1 AND NOT EXISTS (
                     SELECT 1 FROM sop_versions kept
                     JOIN sop_versions dropped
                       ON dropped.sop_id = ?1 AND dropped.version = kept.version
                     WHERE kept.sop_id = ?2 AND kept.version = a.sop_version
                       AND kept.content = dropped.content)",
            )
            .bind(drop)
            .bind(keep)
            .fetch_one(&mut *conn)
            .await?;

            let moved = sqlx::query(
                "UPDATE OR IGNORE acknowledgments SET sop_id = ?2
                 WHERE sop_id = ?1 AND EXISTS (
                     SELECT 1 FROM sop_versions kept
                     JOIN sop_versions dropped
                       ON dropped.sop_id = ?1 AND dropped.version = kept.version
                     WHERE kept.sop_id = ?2 AND kept.version = acknowledgments.sop_version
                       AND kept.content = dropped.content)",
            )
            .bind(drop)
            .bind(keep)
            .execute(&mut *conn)
            .await?
            .rows_affected();

            sqlx::query("DELETE FROM acknowledgments WHERE sop_id = ?")
                .bind(drop)
                .execute(&mut *conn)
                .await?;
            sqlx::query("DELETE FROM sop_versions WHERE sop_id = ?")
                .bind(drop)
                .execute(&mut *conn)
                .await?;
            sqlx::query("DELETE FROM sops WHERE id = ?")
                .bind(drop)
                .execute(&mut *conn)
                .await?;

            if discarded > 0 {
                tracing::warn!(
                    kept = keep,
                    dropped = drop,
                    discarded,
                    "acknowledgments of versions missing from the kept SOP were discarded"
                );
            }
            tracing::info!(kept = keep, dropped = drop, moved, "merged duplicate SOP");
            summary.removed += 1;
            summary.moved_acks += moved;
            summary.discarded_acks += discarded as u64;
        }
    }
    Ok(summary)
}
