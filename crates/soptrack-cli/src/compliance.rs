//! # Compliance Command
//!
//! Prints the per-SOP compliance report for a window, as a table or as the
//! dashboard's CSV export.

use std::io::Write;

use anyhow::Result;
use chrono::Utc;
use clap::{Args, ValueEnum};
use soptrack_api::{csv_export, db};
use soptrack_core::ComplianceWindow;
use sqlx::SqlitePool;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Csv,
}

/// Arguments for `soptrack compliance`.
#[derive(Args, Debug)]
pub struct ComplianceArgs {
    /// Count acknowledgments from this day (YYYY-MM-DD). Never earlier than
    /// the re-acknowledgment cutoff.
    #[arg(long)]
    pub start_date: Option<String>,

    /// Count acknowledgments up to this day (YYYY-MM-DD).
    #[arg(long)]
    pub end_date: Option<String>,

    /// Days after which an acknowledgment no longer counts.
    #[arg(long, env = "SOPTRACK_REACK_DAYS", default_value_t = 365)]
    pub reack_days: u32,

    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

pub async fn run_compliance(
    args: &ComplianceArgs,
    pool: &SqlitePool,
    out: &mut impl Write,
) -> Result<u8> {
    let window = ComplianceWindow::resolve(
        Utc::now().date_naive(),
        args.reack_days,
        args.start_date.as_deref(),
        args.end_date.as_deref(),
    );
    let report = db::compliance::report(pool, window).await?;

    if args.format == ReportFormat::Csv {
        out.write_all(&csv_export::compliance(&report)?)?;
        return Ok(0);
    }

    let end = window.end_param().unwrap_or_else(|| "open".to_string());
    writeln!(out, "Window: {} to {end}", window.start_param())?;
    writeln!(
        out,
        "Overall: {:.1}% ({} of {} across {} SOPs and {} active staff)",
        report.overall.percent(),
        report.overall.acknowledged,
        report.overall.eligible,
        report.sop_count,
        report.staff_count
    )?;
    writeln!(out)?;
    for line in &report.sops {
        writeln!(
            out,
            "{:>6.1}%  {:>4}/{:<4}  {} (v{}, {})",
            line.rate.percent(),
            line.rate.acknowledged,
            line.rate.eligible,
            line.sop.title,
            line.sop.current_version,
            line.sop.category
        )?;
    }
    let overdue = report.overdue().count();
    if overdue > 0 {
        writeln!(out)?;
        writeln!(out, "{overdue} SOP(s) missing acknowledgments")?;
    }
    Ok(0)
}
