use chrono::NaiveDate;
use tracing::debug;

use super::types::{ResolvedSchema, SourceKind, SourceSchema};
use crate::history::store::Dataset;
use crate::process::date_parser::parse_report_date;
use crate::process::record::Record;
use crate::process::utils::parse_number;

/// One acquisition cohort: size plus one value per offset month.
#[derive(Debug, Clone, PartialEq)]
pub struct CohortRow {
    /// Left as text; alignment decides whether it parses.
    pub cohort_date: String,
    pub affiliate: Option<String>,
    pub metric: Option<String>,
    pub cohort_size: f64,
    /// Offset 0 is the acquisition month.
    pub values: Vec<f64>,
}

/// One affiliate/month line of a financial report.
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialRow {
    pub affiliate: Option<String>,
    pub month: NaiveDate,
    pub users: f64,
    pub profit: f64,
    /// Absolute paid-out amount.
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRow {
    pub affiliate: Option<String>,
    pub date: NaiveDate,
    pub amount: f64,
    pub currency: Option<String>,
    pub status: Option<String>,
}

fn number(schema: &ResolvedSchema, record: &Record, field: &str) -> f64 {
    schema
        .value(record, field)
        .and_then(parse_number)
        .unwrap_or(0.0)
}

fn resolve(dataset: &Dataset, schema: &SourceSchema, expected: SourceKind) -> Option<ResolvedSchema> {
    if schema.kind != expected {
        debug!(kind = ?schema.kind, ?expected, "schema kind mismatch");
        return None;
    }
    Some(schema.resolve(&dataset.fields))
}

/// Cohort rows of `dataset`.
///
/// Blank cells after the last filled month end a cohort's sequence; blank or
/// unparseable cells before it count as 0.
pub fn cohort_rows(dataset: &Dataset, schema: &SourceSchema) -> Vec<CohortRow> {
    let Some(resolved) = resolve(dataset, schema, SourceKind::Cohort) else {
        return Vec::new();
    };

    dataset
        .rows
        .iter()
        .map(|record| {
            let cells: Vec<(usize, Option<f64>, bool)> = resolved
                .month_columns
                .iter()
                .map(|(offset, header)| {
                    let raw = record.get(header).unwrap_or("").trim();
                    (*offset, parse_number(raw), !raw.is_empty())
                })
                .collect();

            let len = cells
                .iter()
                .filter(|(_, _, filled)| *filled)
                .map(|(offset, _, _)| offset + 1)
                .max()
                .unwrap_or(0);
            let mut values = vec![0.0; len];
            for (offset, value, _) in cells {
                if offset < len {
                    values[offset] = value.unwrap_or(0.0);
                }
            }

            CohortRow {
                cohort_date: resolved.text(record, "cohort_date").unwrap_or_default(),
                affiliate: resolved.text(record, "affiliate"),
                metric: resolved.text(record, "metric"),
                cohort_size: number(&resolved, record, "cohort_size"),
                values,
            }
        })
        .collect()
}

/// Financial rows of `dataset`; rows without a parseable month are dropped.
pub fn financial_rows(dataset: &Dataset, schema: &SourceSchema) -> Vec<FinancialRow> {
    let Some(resolved) = resolve(dataset, schema, SourceKind::Financial) else {
        return Vec::new();
    };

    dataset
        .rows
        .iter()
        .filter_map(|record| {
            let raw_month = resolved.value(record, "month").unwrap_or("");
            let Some(month) = parse_report_date(raw_month) else {
                debug!(month = raw_month, "dropping financial row with unparseable month");
                return None;
            };
            Some(FinancialRow {
                affiliate: resolved.text(record, "affiliate"),
                month,
                users: number(&resolved, record, "users"),
                profit: number(&resolved, record, "profit"),
                cost: number(&resolved, record, "cost").abs(),
            })
        })
        .collect()
}

/// Payment rows of `dataset`; rows without a parseable date are dropped.
pub fn payment_rows(dataset: &Dataset, schema: &SourceSchema) -> Vec<PaymentRow> {
    let Some(resolved) = resolve(dataset, schema, SourceKind::Payments) else {
        return Vec::new();
    };

    dataset
        .rows
        .iter()
        .filter_map(|record| {
            let date = parse_report_date(resolved.value(record, "date").unwrap_or(""))?;
            Some(PaymentRow {
                affiliate: resolved.text(record, "affiliate"),
                date,
                amount: number(&resolved, record, "amount"),
                currency: resolved.text(record, "currency"),
                status: resolved.text(record, "status"),
            })
        })
        .collect()
}
