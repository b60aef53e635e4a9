//! Compliance queries.
//!
//! One query selects the qualifying `(sop_id, staff_id)` pairs: active
//! staff, current SOP version, acknowledged inside the window. The
//! arithmetic lives in [`ComplianceReport::build`].

use std::collections::HashSet;

use soptrack_core::{ComplianceReport, ComplianceWindow};
use sqlx::SqlitePool;

use super::{sops, staff};

/// Distinct pairs of SOP and active staff member with a qualifying
/// acknowledgment.
pub async fn qualifying_pairs(
    pool: &SqlitePool,
    window: &ComplianceWindow,
) -> Result<HashSet<(i64, i64)>, sqlx::Error> {
    let end = window.end_param();
    let rows: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT DISTINCT a.sop_id, a.staff_id
         FROM acknowledgments a
         JOIN sops p ON p.id = a.sop_id AND a.sop_version = p.current_version
         JOIN staff s ON s.id = a.staff_id AND s.active = 1
         WHERE date(a.acknowledged_at) >= date(?)
           AND (? IS NULL OR date(a.acknowledged_at) <= date(?))",
    )
    .bind(window.start_param())
    .bind(&end)
    .bind(&end)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().collect())
}

/// Build the full report for `window`.
pub async fn report(
    pool: &SqlitePool,
    window: ComplianceWindow,
) -> Result<ComplianceReport, sqlx::Error> {
    let sops = sops::refs(pool).await?;
    let staff = staff::active_refs(pool).await?;
    let pairs = qualifying_pairs(pool, &window).await?;
    Ok(ComplianceReport::build(window, sops, staff, &pairs))
}
