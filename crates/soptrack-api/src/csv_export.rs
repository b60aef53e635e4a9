//! # CSV Exports
//!
//! Each export is a header row plus one record per row, written with the
//! `csv` crate so quoting is always correct. Timestamps use
//! `YYYY-MM-DD HH:MM:SS`.

use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDateTime;
use soptrack_core::ComplianceReport;

use crate::db::acknowledgments::AckExportRow;
use crate::db::audit::AuditRecord;
use crate::db::sops::SopSummary;

fn timestamp(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn write_all<const N: usize>(
    headers: [&str; N],
    rows: impl IntoIterator<Item = [String; N]>,
) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

pub fn acknowledgments(rows: &[AckExportRow]) -> Result<Vec<u8>, csv::Error> {
    write_all(
        [
            "acknowledged_at",
            "sop_title",
            "category",
            "staff_name",
            "sop_version",
            "read_seconds",
            "ip_address",
        ],
        rows.iter().map(|r| {
            [
                timestamp(&r.acknowledged_at),
                r.sop_title.clone(),
                r.category.clone(),
                r.staff_name.clone(),
                r.sop_version.to_string(),
                r.read_seconds.to_string(),
                r.ip_address.clone().unwrap_or_default(),
            ]
        }),
    )
}

pub fn sops(rows: &[SopSummary]) -> Result<Vec<u8>, csv::Error> {
    write_all(
        ["title", "category", "current_version", "updated_at"],
        rows.iter().map(|r| {
            [
                r.title.clone(),
                r.category.clone(),
                r.current_version.to_string(),
                timestamp(&r.updated_at),
            ]
        }),
    )
}

pub fn audit(rows: &[AuditRecord]) -> Result<Vec<u8>, csv::Error> {
    write_all(
        ["created_at", "action", "entity_type", "entity_id", "details", "username"],
        rows.iter().map(|r| {
            [
                timestamp(&r.created_at),
                r.action.clone(),
                r.entity_type.clone(),
                r.entity_id.map(|id| id.to_string()).unwrap_or_default(),
                r.details.clone().unwrap_or_default(),
                r.username.clone().unwrap_or_default(),
            ]
        }),
    )
}

/// Per-SOP compliance lines of a report.
pub fn compliance(report: &ComplianceReport) -> Result<Vec<u8>, csv::Error> {
    write_all(
        [
            "sop_id",
            "title",
            "category",
            "current_version",
            "acknowledged",
            "eligible",
            "rate_percent",
        ],
        report.sops.iter().map(|line| {
            [
                line.sop.id.to_string(),
                line.sop.title.clone(),
                line.sop.category.clone(),
                line.sop.current_version.to_string(),
                line.rate.acknowledged.to_string(),
                line.rate.eligible.to_string(),
                format!("{:.1}", line.rate.percent()),
            ]
        }),
    )
}

/// Serve `body` as a CSV download.
pub fn attachment(filename: &str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}
