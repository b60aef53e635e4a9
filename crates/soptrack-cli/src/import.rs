//! # Import Commands
//!
//! `import-sops` walks a document directory; `import-staff` reads a roster
//! CSV. Both report counts and record an audit entry with no actor.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use soptrack_api::db::{self, audit::AuditEntry};
use soptrack_api::import::import_directory;
use soptrack_core::roster::parse_roster;
use sqlx::SqlitePool;

/// Arguments for `soptrack import-sops`.
#[derive(Args, Debug)]
pub struct ImportSopsArgs {
    /// Directory of `.txt` / `.md` documents. Subfolder names map to categories.
    pub dir: PathBuf,
}

/// Arguments for `soptrack import-staff`.
#[derive(Args, Debug)]
pub struct ImportStaffArgs {
    /// Roster CSV with a `name` column.
    pub file: PathBuf,
}

pub async fn run_import_sops(
    args: &ImportSopsArgs,
    pool: &SqlitePool,
    out: &mut impl Write,
) -> Result<u8> {
    let summary = import_directory(pool, &args.dir, None)
        .await
        .with_context(|| format!("importing {}", args.dir.display()))?;
    writeln!(out, "Scanned:      {}", summary.scanned)?;
    writeln!(out, "Inserted:     {}", summary.inserted)?;
    writeln!(out, "New versions: {}", summary.new_versions)?;
    writeln!(out, "Unchanged:    {}", summary.unchanged)?;
    writeln!(out, "Skipped:      {}", summary.skipped)?;
    writeln!(out, "Merged:       {}", summary.merged)?;
    if summary.discarded_acks > 0 {
        writeln!(out, "Discarded acknowledgments: {}", summary.discarded_acks)?;
    }
    Ok(0)
}

pub async fn run_import_staff(
    args: &ImportStaffArgs,
    pool: &SqlitePool,
    out: &mut impl Write,
) -> Result<u8> {
    let file = std::fs::File::open(&args.file)
        .with_context(|| format!("opening {}", args.file.display()))?;
    let parsed =
        parse_roster(file).with_context(|| format!("reading roster {}", args.file.display()))?;
    for row in &parsed.skipped {
        writeln!(out, "line {}: {}", row.line, row.reason)?;
    }

    let summary = db::staff::import_roster(pool, &parsed).await?;
    db::audit::record(
        pool,
        AuditEntry::new(None, "import", "staff").details(format!(
            "count={} duplicates={} skipped={}",
            summary.inserted, summary.duplicates, summary.skipped
        )),
    )
    .await?;

    writeln!(
        out,
        "Roster imported: {} added, {} already on file, {} skipped.",
        summary.inserted, summary.duplicates, summary.skipped
    )?;
    Ok(0)
}
