use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::process::date_parser::{absolute_month_index, month_label, parse_report_date};
use crate::schema::CohortRow;

/// All cohorts acquired in one calendar month, summed offset by offset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedCohort {
    /// `year * 12 + zero_based_month` of the acquisition month.
    pub month_index: i32,
    pub cohort_size: f64,
    pub values: Vec<f64>,
    /// Number of source rows folded in.
    pub rows: usize,
}

impl AggregatedCohort {
    /// `YYYY-MM` of the acquisition month.
    pub fn label(&self) -> String {
        month_label(self.month_index)
    }

    fn absorb(&mut self, row: &CohortRow) {
        if row.values.len() > self.values.len() {
            self.values.resize(row.values.len(), 0.0);
        }
        for (slot, v) in self.values.iter_mut().zip(&row.values) {
            *slot += v;
        }
        self.cohort_size += row.cohort_size;
        self.rows += 1;
    }
}

/// Group cohorts by acquisition month and sum them, ascending by month.
/// Rows whose date does not parse are dropped.
pub fn align_cohorts(rows: &[CohortRow]) -> Vec<AggregatedCohort> {
    let mut groups: BTreeMap<i32, AggregatedCohort> = BTreeMap::new();
    let mut dropped = 0usize;

    for row in rows {
        let Some(date) = parse_report_date(&row.cohort_date) else {
            dropped += 1;
            continue;
        };
        let month_index = absolute_month_index(date);
        groups
            .entry(month_index)
            .or_insert_with(|| AggregatedCohort {
                month_index,
                cohort_size: 0.0,
                values: Vec::new(),
                rows: 0,
            })
            .absorb(row);
    }

    if dropped > 0 {
        debug!(dropped, "cohort rows without a parseable date");
    }
    groups.into_values().collect()
}
