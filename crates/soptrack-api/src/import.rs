//! # SOP Document Import
//!
//! Walks a directory tree for `.txt` and `.md` files and upserts each as
//! an SOP, matched by cleaned title. A document whose content changed
//! becomes a new version. After the upserts, SOPs whose titles clean to
//! the same text are merged. The whole run is one transaction and one
//! `import` audit entry.
//!
//! The immediate parent folder name feeds category mapping, so a tree like
//! `Policies/Safety (SF)/Fire_Drill.txt` lands in `Safety`.

use std::path::{Path, PathBuf};

use serde::Serialize;
use soptrack_core::document::SopDocument;
use sqlx::SqlitePool;
use thiserror::Error;
use walkdir::WalkDir;

use crate::db::{self, audit::AuditEntry, sops::UpsertOutcome};

const IMPORTABLE_EXTENSIONS: &[&str] = &["txt", "md"];

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("document directory {0} does not exist")]
    MissingDirectory(PathBuf),
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("document scan task failed: {0}")]
    Scan(String),
}

/// Counts reported after an import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub scanned: u64,
    pub inserted: u64,
    pub new_versions: u64,
    pub unchanged: u64,
    pub skipped: u64,
    pub merged: u64,
    /// Acknowledgments lost with merged SOPs whose versions did not match.
    pub discarded_acks: u64,
}

/// A document read from disk.
#[derive(Debug, Clone)]
struct ScannedFile {
    relative_path: String,
    document: SopDocument,
}

fn is_importable(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.starts_with('.') || name.starts_with("~$") {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            IMPORTABLE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

/// Read every importable file under `root`. Unreadable or empty files are
/// logged and counted as skipped.
fn scan(root: &Path) -> (Vec<ScannedFile>, u64) {
    let mut files = Vec::new();
    let mut skipped = 0;
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable directory entry");
                skipped += 1;
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() || !is_importable(path) {
            continue;
        }
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping unreadable document");
                skipped += 1;
                continue;
            }
        };
        let file_name = entry.file_name().to_string_lossy();
        let folder = path
            .parent()
            .filter(|p| *p != root)
            .and_then(|p| p.file_name())
            .map(|f| f.to_string_lossy().into_owned());
        let Some(document) = SopDocument::from_text(&file_name, folder.as_deref(), &raw) else {
            tracing::warn!(path = %path.display(), "skipping empty document");
            skipped += 1;
            continue;
        };
        let relative_path = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned();
        files.push(ScannedFile {
            relative_path,
            document,
        });
    }
    (files, skipped)
}

/// Import every document under `dir`.
pub async fn import_directory(
    pool: &SqlitePool,
    dir: &Path,
    actor: Option<i64>,
) -> Result<ImportSummary, ImportError> {
    if !dir.is_dir() {
        return Err(ImportError::MissingDirectory(dir.to_path_buf()));
    }
    let root = dir.to_path_buf();
    let (files, skipped) = tokio::task::spawn_blocking(move || scan(&root))
        .await
        .map_err(|e| ImportError::Scan(e.to_string()))?;

    let mut summary = ImportSummary {
        scanned: files.len() as u64 + skipped,
        skipped,
        ..Default::default()
    };

    let mut tx = pool.begin().await?;
    for file in &files {
        match db::sops::upsert_document(&mut tx, &file.document, &file.relative_path).await? {
            UpsertOutcome::Inserted { .. } => summary.inserted += 1,
            UpsertOutcome::NewVersion { .. } => summary.new_versions += 1,
            UpsertOutcome::Unchanged { .. } => summary.unchanged += 1,
        }
    }
    let merge = db::sops::dedupe_by_title(&mut tx).await?;
    summary.merged = merge.removed;
    summary.discarded_acks = merge.discarded_acks;
    db::audit::record(
        &mut *tx,
        AuditEntry::new(actor, "import", "sop").details(format!(
            "count={} inserted={} versions={} merged={} moved_acks={} discarded_acks={}",
            files.len(),
            summary.inserted,
            summary.new_versions,
            summary.merged,
            merge.moved_acks,
            summary.discarded_acks
        )),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        dir = %dir.display(),
        scanned = summary.scanned,
        inserted = summary.inserted,
        new_versions = summary.new_versions,
        unchanged = summary.unchanged,
        skipped = summary.skipped,
        merged = summary.merged,
        discarded_acks = summary.discarded_acks,
        "document import finished"
    );
    Ok(summary)
}

/// Import at startup when configured and no SOPs exist yet.
pub async fn import_if_empty(pool: &SqlitePool, dir: &Path) -> Result<Option<ImportSummary>, ImportError> {
    if db::sops::count(pool).await? > 0 {
        tracing::debug!("SOPs already present, skipping startup import");
        return Ok(None);
    }
    import_directory(pool, dir, None).await.map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn only_text_documents_are_importable() {
        assert!(is_importable(Path::new("a/Fire_Drill.txt")));
        assert!(is_importable(Path::new("a/Notes.MD")));
        assert!(!is_importable(Path::new("a/Fire_Drill.docx")));
        assert!(!is_importable(Path::new("a/~$Fire_Drill.txt")));
        assert!(!is_importable(Path::new("a/.hidden.txt")));
    }

    #[tokio::test]
    async fn imports_then_versions_changed_documents() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Safety (SF)/SF.01.MRC - Fire_Drill_Policy.txt", "Last Reviewed: 3/2024\nPull the alarm.\nLeave the building.");
        write(dir.path(), "Intake_Procedure.md", "Greet the client and verify insurance for admission.");
        write(dir.path(), "Empty.txt", "   \n");
        write(dir.path(), "Scan.docx", "binary");

        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        let first = import_directory(&pool, dir.path(), None).await.unwrap();
        assert_eq!(first.inserted, 2);
        assert_eq!(first.skipped, 1);

        let sops = db::sops::list_by_title(&pool).await.unwrap();
        let titles: Vec<_> = sops.iter().map(|s| (s.title.as_str(), s.category.as_str())).collect();
        assert_eq!(titles, vec![("Fire Drill", "Safety"), ("Intake", "Admissions")]);

        let fire = db::sops::get(&pool, sops[0].id).await.unwrap().unwrap();
        assert_eq!(fire.last_reviewed.as_deref(), Some("3/2024"));
        assert!(!fire.display_content().contains("Last Reviewed"));

        let again = import_directory(&pool, dir.path(), None).await.unwrap();
        assert_eq!(again.unchanged, 2);

        write(dir.path(), "Intake_Procedure.md", "Greet the client, verify insurance, and schedule admission.");
        let changed = import_directory(&pool, dir.path(), None).await.unwrap();
        assert_eq!(changed.new_versions, 1);
        assert!(import_if_empty(&pool, dir.path()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        let err = import_directory(&pool, Path::new("/definitely/not/here"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::MissingDirectory(_)));
    }
}
