use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::{info, warn};

use super::backup::{backup_copy, prune_backups};
use crate::process::record::Record;

/// The accumulated dataset: one canonical header set plus rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub fields: Vec<String>,
    pub rows: Vec<Record>,
}

/// Load the canonical dataset, or `None` if it has not been written yet.
pub fn read_dataset(path: &Path) -> Result<Option<Dataset>> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let fields: Vec<String> = rdr
        .headers()
        .with_context(|| format!("reading header of {}", path.display()))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record =
            result.with_context(|| format!("CSV parse error in {} at record {}", path.display(), idx))?;
        let values: Vec<String> = record.iter().map(str::to_string).collect();
        rows.push(Record::from_positional(&fields, &values));
    }
    Ok(Some(Dataset { fields, rows }))
}

/// Serialize `dataset` as comma-separated text, quoting only fields that hold
/// the delimiter, a quote or a line break.
pub fn write_dataset<W: Write>(writer: W, dataset: &Dataset) -> Result<()> {
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .from_writer(writer);
    wtr.write_record(&dataset.fields).context("writing header row")?;
    for (idx, row) in dataset.rows.iter().enumerate() {
        wtr.write_record(row.project(&dataset.fields))
            .with_context(|| format!("writing row {}", idx))?;
    }
    wtr.flush().context("flushing dataset writer")?;
    Ok(())
}

/// Outcome of one [`AtomicWriter::write`].
#[derive(Debug, Clone, PartialEq)]
pub struct WriteReport {
    pub canonical: PathBuf,
    /// Copy of the previous canonical file, when there was one.
    pub backup: Option<PathBuf>,
    pub rows_written: usize,
}

/// Replaces the canonical dataset file as a whole: back up the old file,
/// write a sibling temp file, rename it over the canonical path.
#[derive(Debug, Clone)]
pub struct AtomicWriter {
    canonical: PathBuf,
    backup_dir: PathBuf,
    retention: Option<usize>,
}

impl AtomicWriter {
    pub fn new(canonical: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            canonical: canonical.into(),
            backup_dir: backup_dir.into(),
            retention: None,
        }
    }

    pub fn with_retention(mut self, keep: Option<usize>) -> Self {
        self.retention = keep;
        self
    }

    pub fn canonical(&self) -> &Path {
        &self.canonical
    }

    /// `.<file_name>.tmp` next to the canonical file.
    pub fn temp_path(&self) -> PathBuf {
        let name = self
            .canonical
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "dataset".to_string());
        self.canonical.with_file_name(format!(".{}.tmp", name))
    }

    pub fn write(&self, dataset: &Dataset, now: DateTime<Utc>) -> Result<WriteReport> {
        if let Some(parent) = self.canonical.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }

        let backup = if self.canonical.exists() {
            let path = backup_copy(&self.canonical, &self.backup_dir, now)?;
            if let Some(keep) = self.retention {
                prune_backups(&self.canonical, &self.backup_dir, keep)?;
            }
            Some(path)
        } else {
            None
        };

        let tmp_path = self.temp_path();
        if let Err(e) = self.write_temp(&tmp_path, dataset) {
            self.discard_temp(&tmp_path);
            return Err(e);
        }
        if let Err(e) = fs::rename(&tmp_path, &self.canonical) {
            self.discard_temp(&tmp_path);
            return Err(e).with_context(|| {
                format!(
                    "renaming {} -> {}",
                    tmp_path.display(),
                    self.canonical.display()
                )
            });
        }

        info!(
            path = %self.canonical.display(),
            rows = dataset.rows.len(),
            "canonical dataset written"
        );
        Ok(WriteReport {
            canonical: self.canonical.clone(),
            backup,
            rows_written: dataset.rows.len(),
        })
    }

    fn write_temp(&self, tmp_path: &Path, dataset: &Dataset) -> Result<()> {
        let file = File::create(tmp_path)
            .with_context(|| format!("could not create temporary file `{}`", tmp_path.display()))?;
        let mut buf = BufWriter::new(file);
        write_dataset(&mut buf, dataset)?;
        let file = buf
            .into_inner()
            .map_err(|e| e.into_error())
            .context("flushing temporary file")?;
        file.sync_all().context("syncing temporary file")?;
        Ok(())
    }

    fn discard_temp(&self, tmp_path: &Path) {
        if tmp_path.exists() {
            if let Err(e) = fs::remove_file(tmp_path) {
                warn!(path = %tmp_path.display(), error = %e, "could not remove temporary file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn sample() -> Dataset {
        let fields: Vec<String> = vec!["id".into(), "note".into()];
        let rows = vec![
            Record::from_positional(&fields, &["1".into(), "plain".into()]),
            Record::from_positional(&fields, &["2".into(), "has, comma \"and\" quote".into()]),
            Record::from_positional(&fields, &["3".into(), "two\nlines".into()]),
        ];
        Dataset { fields, rows }
    }

    #[test]
    fn quotes_only_when_needed() {
        let mut out = Vec::new();
        write_dataset(&mut out, &sample()).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "id,note\n1,plain\n2,\"has, comma \"\"and\"\" quote\"\n3,\"two\nlines\"\n"
        );
    }

    #[test]
    fn written_dataset_reads_back() {
        let tmp = tempdir().unwrap();
        let writer = AtomicWriter::new(tmp.path().join("acc.csv"), tmp.path().join("bk"));
        writer.write(&sample(), Utc::now()).unwrap();
        assert_eq!(read_dataset(writer.canonical()).unwrap(), Some(sample()));
        assert!(!writer.temp_path().exists());
    }

    #[test]
    fn missing_canonical_reads_as_none() {
        let tmp = tempdir().unwrap();
        assert_eq!(read_dataset(&tmp.path().join("nope.csv")).unwrap(), None);
    }

    #[test]
    fn overwrite_backs_up_previous_canonical() {
        let tmp = tempdir().unwrap();
        let writer = AtomicWriter::new(tmp.path().join("acc.csv"), tmp.path().join("bk"));
        let first = writer.write(&sample(), Utc::now()).unwrap();
        assert_eq!(first.backup, None);

        let mut grown = sample();
        grown
            .rows
            .push(Record::from_positional(&grown.fields, &["4".into(), "new".into()]));
        let second = writer.write(&grown, Utc::now()).unwrap();
        let backup = second.backup.expect("backup of first write");
        assert_eq!(read_dataset(&backup).unwrap(), Some(sample()));
        assert_eq!(read_dataset(writer.canonical()).unwrap().unwrap().rows.len(), 4);
    }

    #[test]
    fn failed_write_leaves_canonical_untouched() {
        let tmp = tempdir().unwrap();
        let canonical = tmp.path().join("acc.csv");
        fs::write(&canonical, "id\n1\n").unwrap();
        let writer = AtomicWriter::new(&canonical, tmp.path().join("bk"));
        // a directory squatting on the temp path makes File::create fail
        fs::create_dir(writer.temp_path()).unwrap();

        assert!(writer.write(&sample(), Utc::now()).is_err());
        assert_eq!(fs::read_to_string(&canonical).unwrap(), "id\n1\n");
    }
}
