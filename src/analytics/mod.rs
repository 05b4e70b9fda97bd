// src/analytics/mod.rs
pub mod align;
pub mod breakeven;
pub mod cache;
pub mod filter;
pub mod health;
pub mod loader;
pub mod retention;
pub mod series;

use serde::Serialize;
use tracing::debug;

pub use align::{align_cohorts, AggregatedCohort};
pub use breakeven::{break_even, break_even_curve, BreakEvenCurve};
pub use cache::{CacheEntry, ReportCache};
pub use filter::AnalyticsFilter;
pub use health::{classify, Health, HealthInputs, HealthReport};
pub use loader::{GenerationGate, SourceLoader};
pub use retention::{normalize, Checkpoints, NormalizedCohort, RetentionSummary};
pub use series::{monthly_series, payment_series, MonthlySeries};

use crate::schema::{CohortRow, FinancialRow};

/// Everything the cohort views show for one filter selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortReport {
    pub filter: AnalyticsFilter,
    pub cohorts: Vec<NormalizedCohort>,
    pub checkpoints: Checkpoints,
    pub summary: RetentionSummary,
    pub health: HealthReport,
}

/// Filter, align, normalize and classify, from scratch.
#[tracing::instrument(level = "debug", skip(rows), fields(rows = rows.len()))]
pub fn cohort_report(rows: &[CohortRow], filter: &AnalyticsFilter) -> CohortReport {
    let selected = filter.cohorts(rows);
    let cohorts: Vec<NormalizedCohort> = align_cohorts(&selected).into_iter().map(normalize).collect();
    let checkpoints = Checkpoints::of(&cohorts);
    let summary = RetentionSummary::of(&cohorts);
    let health = classify(&HealthInputs::new(&checkpoints, &summary));
    debug!(cohorts = cohorts.len(), health = ?health.health, "cohort report built");

    CohortReport {
        filter: filter.clone(),
        cohorts,
        checkpoints,
        summary,
        health,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialReport {
    pub filter: AnalyticsFilter,
    pub series: MonthlySeries,
    pub break_even: BreakEvenCurve,
}

/// Monthly series and break-even curve. `start` is a `YYYY-MM` label; an
/// unknown or absent label starts at the first month.
pub fn financial_report(
    rows: &[FinancialRow],
    filter: &AnalyticsFilter,
    start: Option<&str>,
) -> FinancialReport {
    let series = monthly_series(rows, filter);
    let start_index = start.and_then(|l| series.position(l)).unwrap_or(0);
    let break_even = break_even(&series, start_index);
    FinancialReport {
        filter: filter.clone(),
        series,
        break_even,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn cohort(date: &str, affiliate: &str, values: &[f64]) -> CohortRow {
        CohortRow {
            cohort_date: date.to_string(),
            affiliate: Some(affiliate.to_string()),
            metric: None,
            cohort_size: 10.0,
            values: values.to_vec(),
        }
    }

    #[test]
    fn cohort_report_recomputes_per_filter() {
        let rows = vec![
            cohort("2024-01-01", "good", &[100.0, 80.0, 70.0, 60.0]),
            cohort("2024-02-01", "good", &[100.0, 90.0, 70.0, 50.0]),
            cohort("2024-01-15", "bad", &[1000.0, -50.0, 10.0, 5.0]),
        ];

        let good = cohort_report(&rows, &AnalyticsFilter::all().affiliate("good"));
        assert_eq!(good.cohorts.len(), 2);
        assert_eq!(good.checkpoints.m3, Some(55.0));
        assert_eq!(good.health.health, Health::Green);

        let bad = cohort_report(&rows, &AnalyticsFilter::all().affiliate("bad"));
        assert_eq!(bad.cohorts[0].normalized[1], Some(0.0));
        assert_eq!(bad.summary.cohorts_with_net_outflow, 1);
        assert_eq!(bad.health.health, Health::Red);

        let none = cohort_report(&rows, &AnalyticsFilter::all().affiliate("nobody"));
        assert_eq!(none.health.health, Health::NoData);

        let zero_base = vec![cohort("2024-03-01", "fresh", &[0.0, 40.0, 20.0])];
        let fresh = cohort_report(&zero_base, &AnalyticsFilter::all());
        assert_eq!(fresh.summary.early_value_share, None);
        assert_eq!(fresh.health.health, Health::NoData);
    }

    #[test]
    fn financial_report_starts_at_selected_month() {
        let month = |m| NaiveDate::from_ymd_opt(2024, m, 1).unwrap();
        let rows = vec![
            FinancialRow {
                affiliate: None,
                month: month(1),
                users: 1.0,
                profit: 500.0,
                cost: 0.0,
            },
            FinancialRow {
                affiliate: None,
                month: month(2),
                users: 1.0,
                profit: 10.0,
                cost: 40.0,
            },
            FinancialRow {
                affiliate: None,
                month: month(3),
                users: 1.0,
                profit: 50.0,
                cost: 0.0,
            },
        ];
        let report = financial_report(&rows, &AnalyticsFilter::all(), Some("2024-02"));
        assert_eq!(report.break_even.curve, vec![None, Some(-30.0), Some(20.0)]);
        assert_eq!(report.break_even.break_even_months, Some(2));

        let whole = financial_report(&rows, &AnalyticsFilter::all(), None);
        assert_eq!(whole.break_even.break_even_months, Some(1));
    }

    #[test]
    fn cached_report_is_reused_until_invalidated() {
        let rows = vec![cohort("2024-01-01", "a", &[100.0, 50.0])];
        let filter = AnalyticsFilter::all();
        let mut cache: ReportCache<CohortReport> = ReportCache::new();

        let built = cache.get_or_build(|| cohort_report(&rows, &filter)).clone();
        let again = cache.get_or_build(|| unreachable!("cached")).clone();
        assert_eq!(built, again);

        cache.invalidate();
        let rebuilt = cache.get_or_build(|| cohort_report(&rows, &filter.clone().year(2023)));
        assert_eq!(rebuilt.health.health, Health::NoData);
    }
}
