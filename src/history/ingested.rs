use anyhow::{anyhow, Result};
use arrow::{
    array::{ArrayRef, StringArray, TimestampMicrosecondArray, UInt64Array},
    datatypes::{DataType as ArrowDataType, Field, Schema as ArrowSchema, TimeUnit},
    record_batch::RecordBatch,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::{path::PathBuf, sync::Arc};

use crate::history::table_history::{HistoryRow, TableHistory};

/// One completed (non-dry) ingestion run.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestRunRow {
    pub source: String,
    pub strategy: String,
    pub incoming_rows: u64,
    pub rows_added: u64,
    pub duplicates_skipped: u64,
    pub malformed_rows: u64,
    pub run_start: DateTime<Utc>,
    pub run_end: DateTime<Utc>,
}

impl HistoryRow for IngestRunRow {
    const KEY_COLUMN: usize = 0;
    const TIME_COLUMN: usize = 6;

    fn partition_date(&self) -> NaiveDate {
        self.run_end.date_naive()
    }

    fn schema() -> ArrowSchema {
        ArrowSchema::new(vec![
            Field::new("source", ArrowDataType::Utf8, false),
            Field::new("strategy", ArrowDataType::Utf8, false),
            Field::new("incoming_rows", ArrowDataType::UInt64, false),
            Field::new("rows_added", ArrowDataType::UInt64, false),
            Field::new("duplicates_skipped", ArrowDataType::UInt64, false),
            Field::new("malformed_rows", ArrowDataType::UInt64, false),
            Field::new(
                "run_start",
                ArrowDataType::Timestamp(TimeUnit::Microsecond, None),
                false,
            ),
            Field::new(
                "run_end",
                ArrowDataType::Timestamp(TimeUnit::Microsecond, None),
                false,
            ),
        ])
    }

    fn to_arrays(&self) -> Vec<ArrayRef> {
        vec![
            Arc::new(StringArray::from(vec![self.source.clone()])),
            Arc::new(StringArray::from(vec![self.strategy.clone()])),
            Arc::new(UInt64Array::from(vec![self.incoming_rows])),
            Arc::new(UInt64Array::from(vec![self.rows_added])),
            Arc::new(UInt64Array::from(vec![self.duplicates_skipped])),
            Arc::new(UInt64Array::from(vec![self.malformed_rows])),
            Arc::new(TimestampMicrosecondArray::from(vec![self
                .run_start
                .timestamp_micros()])),
            Arc::new(TimestampMicrosecondArray::from(vec![self
                .run_end
                .timestamp_micros()])),
        ]
    }

    fn from_batch(batch: &RecordBatch, row: usize) -> Result<Self> {
        let text = |i: usize| -> Result<String> {
            batch
                .column(i)
                .as_any()
                .downcast_ref::<StringArray>()
                .map(|a| a.value(row).to_string())
                .ok_or_else(|| anyhow!("ingest ledger column {} is not utf8", i))
        };
        let count = |i: usize| -> Result<u64> {
            batch
                .column(i)
                .as_any()
                .downcast_ref::<UInt64Array>()
                .map(|a| a.value(row))
                .ok_or_else(|| anyhow!("ingest ledger column {} is not u64", i))
        };
        let time = |i: usize| -> Result<DateTime<Utc>> {
            let micros = batch
                .column(i)
                .as_any()
                .downcast_ref::<TimestampMicrosecondArray>()
                .map(|a| a.value(row))
                .ok_or_else(|| anyhow!("ingest ledger column {} is not a timestamp", i))?;
            DateTime::<Utc>::from_timestamp_micros(micros)
                .ok_or_else(|| anyhow!("timestamp {} out of range", micros))
        };

        Ok(Self {
            source: text(0)?,
            strategy: text(1)?,
            incoming_rows: count(2)?,
            rows_added: count(3)?,
            duplicates_skipped: count(4)?,
            malformed_rows: count(5)?,
            run_start: time(6)?,
            run_end: time(7)?,
        })
    }

    fn unique_key(&self) -> String {
        format!("{}--{}", self.source, self.run_start.timestamp_micros())
    }
}

/// Ledger of ingestion runs, one Parquet file per run, partitioned by day.
pub type IngestLedger = TableHistory<IngestRunRow>;

impl TableHistory<IngestRunRow> {
    pub fn open_ledger(base: impl Into<PathBuf>) -> Result<Self> {
        TableHistory::new(base, "ingested")
    }

    /// Runs recorded for `source`, oldest first.
    pub fn runs_for(&self, source: &str) -> Result<Vec<IngestRunRow>> {
        let mut runs: Vec<IngestRunRow> = self
            .rows()?
            .into_iter()
            .filter(|r| r.source == source)
            .collect();
        runs.sort_by_key(|r| r.run_start);
        Ok(runs)
    }
}
