//! Audit log persistence.
//!
//! Append-only: rows are inserted by every mutating action and never
//! updated or deleted.

use chrono::NaiveDateTime;
use serde::Serialize;
use soptrack_core::temporal::parse_date_param;
use sqlx::{SqliteExecutor, SqlitePool};

/// Rows shown on the audit page.
pub const PAGE_LIMIT: i64 = 200;

/// One audit entry, joined with the actor's username.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AuditRecord {
    pub id: i64,
    pub created_at: NaiveDateTime,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<i64>,
    pub details: Option<String>,
    pub username: Option<String>,
}

/// An entry to append.
#[derive(Debug, Clone)]
pub struct AuditEntry<'a> {
    pub actor_user_id: Option<i64>,
    pub action: &'a str,
    pub entity_type: &'a str,
    pub entity_id: Option<i64>,
    pub details: Option<String>,
}

impl<'a> AuditEntry<'a> {
    pub fn new(actor_user_id: Option<i64>, action: &'a str, entity_type: &'a str) -> Self {
        Self {
            actor_user_id,
            action,
            entity_type,
            entity_id: None,
            details: None,
        }
    }

    pub fn entity(mut self, id: i64) -> Self {
        self.entity_id = Some(id);
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Audit page filters. Blank values mean "any".
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct AuditFilter {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl AuditFilter {
    pub fn user(&self) -> Option<&str> {
        non_blank(&self.user)
    }

    pub fn action(&self) -> Option<&str> {
        non_blank(&self.action)
    }

    fn start(&self) -> Option<String> {
        parse_date_param(self.start_date.as_deref()).map(|d| d.format("%Y-%m-%d").to_string())
    }

    fn end(&self) -> Option<String> {
        parse_date_param(self.end_date.as_deref()).map(|d| d.format("%Y-%m-%d").to_string())
    }
}

pub async fn record(
    executor: impl SqliteExecutor<'_>,
    entry: AuditEntry<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO audit_log (actor_user_id, action, entity_type, entity_id, details)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(entry.actor_user_id)
    .bind(entry.action)
    .bind(entry.entity_type)
    .bind(entry.entity_id)
    .bind(&entry.details)
    .execute(executor)
    .await?;
    tracing::info!(
        actor = ?entry.actor_user_id,
        action = entry.action,
        entity_type = entry.entity_type,
        entity_id = ?entry.entity_id,
        "audit"
    );
    Ok(())
}

/// Matching entries, newest first. `limit = None` returns everything.
pub async fn search(
    pool: &SqlitePool,
    filter: &AuditFilter,
    limit: Option<i64>,
) -> Result<Vec<AuditRecord>, sqlx::Error> {
    let start = filter.start();
    let end = filter.end();
    sqlx::query_as::<_, AuditRecord>(
        "SELECT a.id, a.created_at, a.action, a.entity_type, a.entity_id, a.details, u.username
         FROM audit_log a LEFT JOIN users u ON u.id = a.actor_user_id
         WHERE (?1 IS NULL OR u.username = ?1)
           AND (?2 IS NULL OR a.action = ?2)
           AND (?3 IS NULL OR date(a.created_at) >= date(?3))
           AND (?4 IS NULL OR date(a.created_at) <= date(?4))
         ORDER BY a.created_at DESC, a.id DESC
         LIMIT ?5",
    )
    .bind(filter.user())
    .bind(filter.action())
    .bind(start)
    .bind(end)
    .bind(limit.unwrap_or(-1))
    .fetch_all(pool)
    .await
}

/// Distinct recorded actions, for the filter dropdown.
pub async fn actions(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT DISTINCT action FROM audit_log ORDER BY action")
        .fetch_all(pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn filters_by_action_and_date() {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        record(&pool, AuditEntry::new(None, "create", "sop").entity(1).details("Fire Drill"))
            .await
            .unwrap();
        record(&pool, AuditEntry::new(None, "update", "sop").entity(1).details("version=2"))
            .await
            .unwrap();
        sqlx::query("UPDATE audit_log SET created_at = '2024-01-05 08:00:00' WHERE action = 'create'")
            .execute(&pool)
            .await
            .unwrap();

        let all = search(&pool, &AuditFilter::default(), Some(PAGE_LIMIT)).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].action, "update");

        let updates = AuditFilter {
            action: Some("update".into()),
            ..Default::default()
        };
        assert_eq!(search(&pool, &updates, None).await.unwrap().len(), 1);

        let early = AuditFilter {
            end_date: Some("2024-12-31".into()),
            start_date: Some("not a date".into()),
            ..Default::default()
        };
        let rows = search(&pool, &early, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].details.as_deref(), Some("Fire Drill"));

        assert_eq!(actions(&pool).await.unwrap(), vec!["create", "update"]);
    }
}
