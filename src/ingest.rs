// src/ingest.rs
use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use std::{
    fmt, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{error, info, warn};

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::history::backup::{backup_copy, prune_backups};
use crate::history::{
    merge_rows, read_dataset, AtomicWriter, IngestLedger, IngestLock, IngestRunRow,
};
use crate::process::{ingest_text, malformed::MalformedRow};

/// What one ingestion run did (or, in a dry run, would do).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestSummary {
    pub source: PathBuf,
    pub dry_run: bool,
    pub strategy: &'static str,
    pub existing_rows: usize,
    pub incoming_rows: usize,
    pub rows_added: usize,
    pub duplicates_skipped: usize,
    pub malformed_count: usize,
    pub malformed_sample: Vec<MalformedRow>,
    pub raw_backup: Option<PathBuf>,
    pub canonical_backup: Option<PathBuf>,
    pub canonical: PathBuf,
}

impl IngestSummary {
    /// `3` flags salvaged malformed rows, `0` otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.malformed_count > 0 {
            3
        } else {
            0
        }
    }
}

impl fmt::Display for IngestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.dry_run { " (dry run)" } else { "" };
        writeln!(f, "source:             {}{}", self.source.display(), mode)?;
        writeln!(f, "strategy:           {}", self.strategy)?;
        writeln!(f, "existing rows:      {}", self.existing_rows)?;
        writeln!(f, "incoming rows:      {}", self.incoming_rows)?;
        writeln!(f, "net new rows:       {}", self.rows_added)?;
        writeln!(f, "duplicates skipped: {}", self.duplicates_skipped)?;
        write!(f, "malformed rows:     {}", self.malformed_count)?;
        for m in &self.malformed_sample {
            write!(f, "\n  row {} has {} fields", m.index, m.field_count)?;
        }
        if let Some(p) = &self.canonical_backup {
            write!(f, "\nprevious dataset:   {}", p.display())?;
        }
        Ok(())
    }
}

fn read_source(source: &Path) -> Result<String, IngestError> {
    let bytes = fs::read(source).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            IngestError::SourceMissing(source.to_path_buf())
        } else {
            IngestError::SourceUnreadable {
                path: source.to_path_buf(),
                source: e,
            }
        }
    })?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(text.strip_prefix('\u{feff}').unwrap_or(&text).to_string())
}

/// Ingest one source file into the canonical dataset.
///
/// Dry runs parse and merge in memory only: no backup, lock, write or ledger
/// entry.
#[tracing::instrument(level = "info", skip(config), fields(source = %source.display()))]
pub fn run_ingest(
    config: &IngestConfig,
    source: &Path,
    dry_run: bool,
) -> Result<IngestSummary, IngestError> {
    let run_start = Utc::now();
    if !source.is_file() {
        error!("source file not found");
        return Err(IngestError::SourceMissing(source.to_path_buf()));
    }
    let source_name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| source.display().to_string());

    let text = read_source(source)?;

    let raw_backup = if dry_run {
        None
    } else {
        let path = backup_copy(source, &config.raw_backup_dir, run_start)
            .context("raw source backup")
            .map_err(IngestError::Write)?;
        if let Some(keep) = config.retention() {
            prune_backups(source, &config.raw_backup_dir, keep).map_err(IngestError::Write)?;
        }
        Some(path)
    };

    let table = ingest_text(&text, &source_name, config.malformed_sample_cap).inspect_err(|e| {
        error!(error = %e, "giving up on source");
    })?;

    let _lock = if dry_run {
        None
    } else {
        Some(IngestLock::acquire(&config.canonical_path)?)
    };

    let existing = read_dataset(&config.canonical_path).map_err(IngestError::Storage)?;
    let (merged, stats) = merge_rows(existing, &table.headers, table.rows);

    let canonical_backup = if dry_run {
        None
    } else {
        let writer = AtomicWriter::new(&config.canonical_path, &config.backup_dir)
            .with_retention(config.retention());
        let report = writer.write(&merged, Utc::now()).map_err(|e| {
            error!(error = %format!("{:#}", e), "canonical write failed; previous file kept");
            IngestError::Write(e)
        })?;

        let run = IngestRunRow {
            source: source_name.clone(),
            strategy: table.strategy.as_str().to_string(),
            incoming_rows: stats.incoming_rows as u64,
            rows_added: stats.rows_added as u64,
            duplicates_skipped: stats.duplicates_skipped as u64,
            malformed_rows: table.malformed_count as u64,
            run_start,
            run_end: Utc::now(),
        };
        // the dataset is already durable; a ledger failure only loses the audit row
        if let Err(e) = IngestLedger::open_ledger(&config.ledger_dir).and_then(|l| l.add(&run)) {
            warn!(error = %format!("{:#}", e), "could not record ingest run");
        }
        report.backup
    };

    info!(
        strategy = table.strategy.as_str(),
        existing = stats.existing_rows,
        incoming = stats.incoming_rows,
        rows_added = stats.rows_added,
        duplicates_skipped = stats.duplicates_skipped,
        malformed = table.malformed_count,
        dry_run,
        "ingestion finished"
    );

    Ok(IngestSummary {
        source: source.to_path_buf(),
        dry_run,
        strategy: table.strategy.as_str(),
        existing_rows: stats.existing_rows,
        incoming_rows: stats.incoming_rows,
        rows_added: stats.rows_added,
        duplicates_skipped: stats.duplicates_skipped,
        malformed_count: table.malformed_count,
        malformed_sample: table.malformed_sample,
        raw_backup,
        canonical_backup,
        canonical: config.canonical_path.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config_in(dir: &Path) -> IngestConfig {
        IngestConfig {
            canonical_path: dir.join("out/accumulated.csv"),
            backup_dir: dir.join("out/backups"),
            raw_backup_dir: dir.join("out/raw"),
            ledger_dir: dir.join("out/history"),
            ..IngestConfig::default()
        }
    }

    #[test]
    fn bom_is_stripped_from_source() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("bom.csv");
        fs::write(&src, "\u{feff}month,ftd\n2024-01,2\n").unwrap();
        let summary = run_ingest(&config_in(tmp.path()), &src, true).unwrap();
        assert_eq!(summary.incoming_rows, 1);
        assert_eq!(summary.strategy, "plain");
    }

    #[test]
    fn held_lock_fails_without_touching_canonical() {
        let tmp = tempdir().unwrap();
        let config = config_in(tmp.path());
        let src = tmp.path().join("a.csv");
        fs::write(&src, "month,ftd\n2024-01,2\n").unwrap();

        let _held = IngestLock::acquire(&config.canonical_path).unwrap();
        let err = run_ingest(&config, &src, false).unwrap_err();
        assert!(matches!(err, IngestError::Locked(_)));
        assert_eq!(err.exit_code(), 4);
        assert!(!config.canonical_path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_source_exits_with_one_and_leaves_no_backup() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempdir().unwrap();
        let config = config_in(tmp.path());
        let src = tmp.path().join("locked.csv");
        fs::write(&src, "month,ftd\n2024-01,2\n").unwrap();
        fs::set_permissions(&src, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read(&src).is_ok() {
            // permission bits do not apply to this user
            return;
        }

        let err = run_ingest(&config, &src, false).unwrap_err();
        assert!(matches!(err, IngestError::SourceUnreadable { .. }));
        assert_eq!(err.exit_code(), 1);
        assert!(!config.raw_backup_dir.exists());
    }

    #[test]
    fn summary_renders_counts() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("a.csv");
        fs::write(&src, "a,b,c\n1,2\n3,4,5\n").unwrap();
        let summary = run_ingest(&config_in(tmp.path()), &src, true).unwrap();
        let text = summary.to_string();
        assert!(text.contains("(dry run)"));
        assert!(text.contains("row 0 has 2 fields"));
    }
}
