//! Acknowledgment persistence.
//!
//! `UNIQUE(sop_id, staff_id, sop_version)` keeps one row per staff member
//! and version. A second acknowledgment of the same version is ignored and
//! reported as [`AckOutcome::AlreadyAcknowledged`], unless the stored one
//! predates the re-acknowledgment cutoff. Then the row is refreshed in
//! place with the new signature and evidence.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use soptrack_core::validation::AckDraft;
use soptrack_core::ComplianceWindow;
use sqlx::SqlitePool;

/// Request metadata stored as evidence with an acknowledgment.
#[derive(Debug, Clone, Default)]
pub struct AckEvidence<'a> {
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    Recorded { version: i64 },
    AlreadyAcknowledged { version: i64 },
    SopMissing,
}

/// An acknowledgment of one SOP, as listed on its detail and evidence pages.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AckRecord {
    pub id: i64,
    pub staff_id: i64,
    pub staff_name: String,
    pub sop_version: i64,
    pub signature_text: String,
    pub read_seconds: i64,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub acknowledged_at: NaiveDateTime,
}

/// Row of the acknowledgment CSV export.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AckExportRow {
    pub acknowledged_at: NaiveDateTime,
    pub sop_title: String,
    pub category: String,
    pub staff_name: String,
    pub sop_version: i64,
    pub read_seconds: i64,
    pub ip_address: Option<String>,
}

/// Dashboard "recent activity" line.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RecentAck {
    pub acknowledged_at: NaiveDateTime,
    pub staff_name: String,
    pub sop_id: i64,
    pub sop_title: String,
    pub sop_version: i64,
}

/// Record that `staff_id` acknowledged the current version of `sop_id`.
///
/// The version is read inside the same transaction as the insert, so an
/// acknowledgment always names a version that existed when it was taken.
/// An existing acknowledgment dated before `cutoff` has expired and is
/// renewed.
pub async fn record(
    pool: &SqlitePool,
    sop_id: i64,
    staff_id: i64,
    draft: &AckDraft,
    evidence: &AckEvidence<'_>,
    cutoff: NaiveDate,
) -> Result<AckOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let Some(version): Option<i64> =
        sqlx::query_scalar("SELECT current_version FROM sops WHERE id = ?")
            .bind(sop_id)
            .fetch_optional(&mut *tx)
            .await?
    else {
        return Ok(AckOutcome::SopMissing);
    };

    let result = sqlx::query(
        "INSERT INTO acknowledgments
            (sop_id, staff_id, sop_version, signature_text, read_seconds, ip_address, user_agent)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT (sop_id, staff_id, sop_version) DO UPDATE SET
            signature_text = excluded.signature_text,
            read_seconds = excluded.read_seconds,
            ip_address = excluded.ip_address,
            user_agent = excluded.user_agent,
            acknowledged_at = datetime('now')
         WHERE date(acknowledgments.acknowledged_at) < date(?)",
    )
    .bind(sop_id)
    .bind(staff_id)
    .bind(version)
    .bind(&draft.signature_text)
    .bind(i64::from(draft.read_seconds))
    .bind(evidence.ip_address)
    .bind(evidence.user_agent)
    .bind(cutoff.format("%Y-%m-%d").to_string())
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(if result.rows_affected() > 0 {
        AckOutcome::Recorded { version }
    } else {
        AckOutcome::AlreadyAcknowledged { version }
    })
}

/// Whether `staff_id` holds an unexpired acknowledgment of `version` of
/// `sop_id`, taken on or after `cutoff`.
pub async fn has_acknowledged(
    pool: &SqlitePool,
    sop_id: i64,
    staff_id: i64,
    version: i64,
    cutoff: NaiveDate,
) -> Result<bool, sqlx::Error> {
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM acknowledgments
         WHERE sop_id = ? AND staff_id = ? AND sop_version = ?
           AND date(acknowledged_at) >= date(?)",
    )
    .bind(sop_id)
    .bind(staff_id)
    .bind(version)
    .bind(cutoff.format("%Y-%m-%d").to_string())
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

/// Every acknowledgment of an SOP, newest first.
pub async fn for_sop(pool: &SqlitePool, sop_id: i64) -> Result<Vec<AckRecord>, sqlx::Error> {
    sqlx::query_as::<_, AckRecord>(
        "SELECT a.id, a.staff_id, s.name AS staff_name, a.sop_version, a.signature_text,
                a.read_seconds, a.ip_address, a.user_agent, a.acknowledged_at
         FROM acknowledgments a JOIN staff s ON s.id = a.staff_id
         WHERE a.sop_id = ?
         ORDER BY a.acknowledged_at DESC, a.id DESC",
    )
    .bind(sop_id)
    .fetch_all(pool)
    .await
}

/// All acknowledgments for the CSV export, newest first.
pub async fn export_rows(pool: &SqlitePool) -> Result<Vec<AckExportRow>, sqlx::Error> {
    sqlx::query_as::<_, AckExportRow>(
        "SELECT a.acknowledged_at, p.title AS sop_title, p.category, s.name AS staff_name,
                a.sop_version, a.read_seconds, a.ip_address
         FROM acknowledgments a
         JOIN sops p ON p.id = a.sop_id
         JOIN staff s ON s.id = a.staff_id
         ORDER BY a.acknowledged_at DESC, a.id DESC",
    )
    .fetch_all(pool)
    .await
}

/// The newest `limit` acknowledgments inside the window.
pub async fn recent_in_window(
    pool: &SqlitePool,
    window: &ComplianceWindow,
    limit: i64,
) -> Result<Vec<RecentAck>, sqlx::Error> {
    let end = window.end_param();
    sqlx::query_as::<_, RecentAck>(
        "SELECT a.acknowledged_at, s.name AS staff_name, p.id AS sop_id, p.title AS sop_title,
                a.sop_version
         FROM acknowledgments a
         JOIN sops p ON p.id = a.sop_id
         JOIN staff s ON s.id = a.staff_id
         WHERE date(a.acknowledged_at) >= date(?)
           AND (? IS NULL OR date(a.acknowledged_at) <= date(?))
         ORDER BY a.acknowledged_at DESC, a.id DESC
         LIMIT ?",
    )
    .bind(window.start_param())
    .bind(&end)
    .bind(&end)
    .bind(limit)
    .fetch_all(pool)
    .await
}
