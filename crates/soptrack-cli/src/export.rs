//! # Export Command
//!
//! Writes the same CSV files the admin pages offer for download, to a file
//! or to standard output.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use soptrack_api::csv_export;
use soptrack_api::db::{self, audit::AuditFilter};
use sqlx::SqlitePool;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportKind {
    Acknowledgments,
    Sops,
    Audit,
}

/// Arguments for `soptrack export`.
#[derive(Args, Debug)]
pub struct ExportArgs {
    #[arg(value_enum)]
    pub kind: ExportKind,

    /// Output file. Standard output when omitted.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Render the CSV for `kind`.
pub async fn render(kind: ExportKind, pool: &SqlitePool) -> Result<Vec<u8>> {
    let body = match kind {
        ExportKind::Acknowledgments => {
            csv_export::acknowledgments(&db::acknowledgments::export_rows(pool).await?)?
        }
        ExportKind::Sops => csv_export::sops(&db::sops::list_by_title(pool).await?)?,
        ExportKind::Audit => {
            csv_export::audit(&db::audit::search(pool, &AuditFilter::default(), None).await?)?
        }
    };
    Ok(body)
}

pub async fn run_export(args: &ExportArgs, pool: &SqlitePool, out: &mut impl Write) -> Result<u8> {
    let body = render(args.kind, pool).await?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, &body).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), bytes = body.len(), "export written");
        }
        None => out.write_all(&body)?,
    }
    Ok(0)
}
