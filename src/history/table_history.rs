use anyhow::{anyhow, Context, Result};
use arrow::{
    array::{ArrayRef, StringArray, TimestampMicrosecondArray},
    datatypes::Schema as ArrowSchema,
    record_batch::RecordBatch,
};
use chrono::{NaiveDate, Utc};
use glob::glob;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use std::{
    collections::HashSet,
    fs::{self, File},
    io::BufWriter,
    marker::PhantomData,
    path::PathBuf,
    sync::{Arc, Mutex},
};

/// Trait representing a row in the history table.
/// - Defines schema, to_arrays, unique_key for writes.
/// - Provides column indices and a small extractor for dedupe scanning.
pub trait HistoryRow: Sized {
    /// Partition date (UTC naive) for hive partitioning
    fn partition_date(&self) -> NaiveDate;
    /// Arrow schema for this row type
    fn schema() -> ArrowSchema;
    /// Convert this row into column arrays matching the schema
    fn to_arrays(&self) -> Vec<ArrayRef>;
    /// Rebuild a row from an existing batch
    fn from_batch(batch: &RecordBatch, row: usize) -> Result<Self>;
    /// Column index for key in schema
    const KEY_COLUMN: usize;
    /// Column index for timestamp in schema
    const TIME_COLUMN: usize;
    /// Unique dedupe key for this row; must agree with `extract_key`
    fn unique_key(&self) -> String;
    /// Extract unique key from an existing batch row (for scanning)
    fn extract_key(batch: &RecordBatch, row: usize) -> Result<String> {
        let key = batch
            .column(Self::KEY_COLUMN)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| anyhow!("KEY_COLUMN must be StringArray"))?
            .value(row);
        let ts = batch
            .column(Self::TIME_COLUMN)
            .as_any()
            .downcast_ref::<TimestampMicrosecondArray>()
            .ok_or_else(|| anyhow!("TIME_COLUMN must be TimestampMicrosecondArray"))?
            .value(row);
        Ok(format!("{}--{}", key, ts))
    }
}

/// Generic hive-partitioned history table: `<base>/<table>/date=YYYYMMDD/*.parquet`.
pub struct TableHistory<R: HistoryRow> {
    base_dir: PathBuf,
    table: String,
    schema: Arc<ArrowSchema>,
    seen: Mutex<HashSet<String>>,
    _marker: PhantomData<R>,
}

impl<R: HistoryRow> TableHistory<R> {
    /// Create the table directory and scan existing dedupe keys into `seen`.
    pub fn new(base_dir: impl Into<PathBuf>, table: &str) -> Result<Self> {
        let base_dir = base_dir.into();
        let table_dir = base_dir.join(table);
        fs::create_dir_all(&table_dir)
            .with_context(|| format!("could not create `{}`", table_dir.display()))?;

        let history = Self {
            base_dir,
            table: table.to_string(),
            schema: Arc::new(R::schema()),
            seen: Mutex::new(HashSet::new()),
            _marker: PhantomData,
        };

        let mut seen_set = HashSet::new();
        for batch in history.batches()? {
            for i in 0..batch.num_rows() {
                seen_set.insert(R::extract_key(&batch, i)?);
            }
        }
        *history.lock_seen()? = seen_set;
        Ok(history)
    }

    /// Append `row` as its own Parquet file; a row whose key is already
    /// present is skipped.
    pub fn add(&self, row: &R) -> Result<()> {
        let key = row.unique_key();
        if !self.lock_seen()?.insert(key.clone()) {
            return Ok(());
        }

        let partition = format!("date={}", row.partition_date().format("%Y%m%d"));
        let dir = self.base_dir.join(&self.table).join(partition);
        fs::create_dir_all(&dir)?;

        let ts = Utc::now().timestamp_micros();
        let fname = format!("{}---{}.parquet", file_safe(&key), ts);
        let tmp = dir.join(format!("{}.tmp", fname));
        let final_path = dir.join(&fname);

        let file = File::create(&tmp)
            .with_context(|| format!("could not create temporary file `{}`", tmp.display()))?;
        let mut writer = ArrowWriter::try_new(BufWriter::new(file), self.schema.clone(), None)
            .context("creating ArrowWriter for history row")?;
        let batch = RecordBatch::try_new(self.schema.clone(), row.to_arrays())
            .context("building RecordBatch for history row")?;
        writer.write(&batch).context("writing history batch")?;
        writer.close().context("closing history writer")?;
        fs::rename(&tmp, &final_path).with_context(|| {
            format!(
                "failed to rename `{}` to `{}`",
                tmp.display(),
                final_path.display()
            )
        })?;
        Ok(())
    }

    /// Check if a row exists by its dedupe key
    pub fn contains(&self, key: &str) -> bool {
        self.lock_seen().map(|s| s.contains(key)).unwrap_or(false)
    }

    /// Every stored row, oldest partition first.
    pub fn rows(&self) -> Result<Vec<R>> {
        let mut out = Vec::new();
        for batch in self.batches()? {
            for i in 0..batch.num_rows() {
                out.push(R::from_batch(&batch, i)?);
            }
        }
        Ok(out)
    }

    fn batches(&self) -> Result<Vec<RecordBatch>> {
        let table_dir = self.base_dir.join(&self.table);
        let pattern = format!("{}/date=*/*.parquet", table_dir.display());
        let mut paths: Vec<PathBuf> = glob(&pattern)
            .context("invalid glob pattern for history scan")?
            .filter_map(Result::ok)
            .collect();
        paths.sort();

        let mut batches = Vec::new();
        for path in paths {
            let file =
                File::open(&path).with_context(|| format!("failed to open `{}`", path.display()))?;
            let mut reader = ParquetRecordBatchReaderBuilder::try_new(file)?
                .with_batch_size(1024)
                .build()?;
            while let Some(batch) = reader.next().transpose()? {
                batches.push(batch);
            }
        }
        Ok(batches)
    }

    fn lock_seen(&self) -> Result<std::sync::MutexGuard<'_, HashSet<String>>> {
        self.seen
            .lock()
            .map_err(|_| anyhow!("history key set poisoned"))
    }
}

fn file_safe(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
