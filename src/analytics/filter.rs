use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::process::date_parser::parse_report_date;
use crate::schema::{CohortRow, FinancialRow, PaymentRow};

/// Selection the reports are computed for. `None` means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalyticsFilter {
    pub affiliate: Option<String>,
    pub year: Option<i32>,
    pub metric: Option<String>,
}

fn same_text(wanted: &Option<String>, actual: Option<&str>) -> bool {
    match wanted {
        None => true,
        Some(w) => actual.is_some_and(|a| a.trim().eq_ignore_ascii_case(w.trim())),
    }
}

impl AnalyticsFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn affiliate(mut self, affiliate: impl Into<String>) -> Self {
        self.affiliate = Some(affiliate.into());
        self
    }

    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn metric(mut self, metric: impl Into<String>) -> Self {
        self.metric = Some(metric.into());
        self
    }

    fn matches_date(&self, date: NaiveDate) -> bool {
        self.year.map_or(true, |y| date.year() == y)
    }

    /// Cohorts inside the selection. With a year set, cohorts whose date
    /// does not parse cannot be placed and are left out.
    pub fn cohorts(&self, rows: &[CohortRow]) -> Vec<CohortRow> {
        rows.iter()
            .filter(|r| same_text(&self.affiliate, r.affiliate.as_deref()))
            .filter(|r| same_text(&self.metric, r.metric.as_deref()))
            .filter(|r| {
                self.year.is_none()
                    || parse_report_date(&r.cohort_date).is_some_and(|d| self.matches_date(d))
            })
            .cloned()
            .collect()
    }

    pub fn financials<'a>(&self, rows: &'a [FinancialRow]) -> Vec<&'a FinancialRow> {
        rows.iter()
            .filter(|r| same_text(&self.affiliate, r.affiliate.as_deref()))
            .filter(|r| self.matches_date(r.month))
            .collect()
    }

    pub fn payments<'a>(&self, rows: &'a [PaymentRow]) -> Vec<&'a PaymentRow> {
        rows.iter()
            .filter(|r| same_text(&self.affiliate, r.affiliate.as_deref()))
            .filter(|r| self.matches_date(r.date))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cohort(date: &str, affiliate: Option<&str>, metric: Option<&str>) -> CohortRow {
        CohortRow {
            cohort_date: date.to_string(),
            affiliate: affiliate.map(str::to_string),
            metric: metric.map(str::to_string),
            cohort_size: 1.0,
            values: vec![1.0],
        }
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let rows = vec![cohort("2024-01", None, None), cohort("garbage", Some("a"), None)];
        assert_eq!(AnalyticsFilter::all().cohorts(&rows).len(), 2);
    }

    #[test]
    fn affiliate_metric_and_year_narrow_the_selection() {
        let rows = vec![
            cohort("2024-01", Some("Acme"), Some("deposits")),
            cohort("2023-12", Some("acme"), Some("deposits")),
            cohort("2024-02", Some("other"), Some("deposits")),
            cohort("2024-03", None, Some("deposits")),
            cohort("2024-04", Some("acme"), Some("ngr")),
            cohort("not a date", Some("acme"), Some("deposits")),
        ];
        let filter = AnalyticsFilter::all()
            .affiliate("ACME")
            .year(2024)
            .metric("deposits");
        let kept = filter.cohorts(&rows);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].cohort_date, "2024-01");
    }
}
