use serde::Serialize;
use std::collections::BTreeMap;

use super::filter::AnalyticsFilter;
use crate::process::date_parser::{absolute_month_index, month_label};
use crate::schema::{FinancialRow, PaymentRow};

/// Gap-free monthly totals, one entry per calendar month from the first to
/// the last month present.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthlySeries {
    pub labels: Vec<String>,
    pub users: Vec<f64>,
    pub profit: Vec<f64>,
    /// Absolute paid-out amount.
    pub cost: Vec<f64>,
}

#[derive(Default)]
struct MonthTotals {
    users: f64,
    profit: f64,
    cost: f64,
}

impl MonthlySeries {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Index of the `YYYY-MM` label, for picking a selection start.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    fn from_months(months: BTreeMap<i32, MonthTotals>) -> Self {
        let (Some(&first), Some(&last)) = (months.keys().next(), months.keys().next_back()) else {
            return Self::default();
        };
        let mut series = Self::default();
        for index in first..=last {
            let totals = months.get(&index);
            series.labels.push(month_label(index));
            series.users.push(totals.map_or(0.0, |t| t.users));
            series.profit.push(totals.map_or(0.0, |t| t.profit));
            series.cost.push(totals.map_or(0.0, |t| t.cost));
        }
        series
    }
}

/// Sum the selected financial rows per calendar month.
pub fn monthly_series(rows: &[FinancialRow], filter: &AnalyticsFilter) -> MonthlySeries {
    let mut months: BTreeMap<i32, MonthTotals> = BTreeMap::new();
    for row in filter.financials(rows) {
        let totals = months.entry(absolute_month_index(row.month)).or_default();
        totals.users += row.users;
        totals.profit += row.profit;
        totals.cost += row.cost.abs();
    }
    MonthlySeries::from_months(months)
}

/// Sum the selected payments per calendar month into the `cost` column.
pub fn payment_series(rows: &[PaymentRow], filter: &AnalyticsFilter) -> MonthlySeries {
    let mut months: BTreeMap<i32, MonthTotals> = BTreeMap::new();
    for row in filter.payments(rows) {
        months.entry(absolute_month_index(row.date)).or_default().cost += row.amount.abs();
    }
    MonthlySeries::from_months(months)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn fin(affiliate: &str, y: i32, m: u32, profit: f64, cost: f64) -> FinancialRow {
        FinancialRow {
            affiliate: Some(affiliate.to_string()),
            month: NaiveDate::from_ymd_opt(y, m, 1).unwrap(),
            users: 1.0,
            profit,
            cost,
        }
    }

    #[test]
    fn months_are_summed_and_gaps_filled() {
        let rows = vec![
            fin("a", 2023, 11, 10.0, 5.0),
            fin("b", 2023, 11, 20.0, -5.0),
            fin("a", 2024, 2, 7.0, 1.0),
        ];
        let series = monthly_series(&rows, &AnalyticsFilter::all());
        assert_eq!(series.labels, vec!["2023-11", "2023-12", "2024-01", "2024-02"]);
        assert_eq!(series.profit, vec![30.0, 0.0, 0.0, 7.0]);
        assert_eq!(series.cost, vec![10.0, 0.0, 0.0, 1.0]);
        assert_eq!(series.users, vec![2.0, 0.0, 0.0, 1.0]);
        assert_eq!(series.position("2024-01"), Some(2));
    }

    #[test]
    fn filter_applies_before_summing() {
        let rows = vec![fin("a", 2024, 1, 10.0, 0.0), fin("b", 2024, 1, 99.0, 0.0)];
        let series = monthly_series(&rows, &AnalyticsFilter::all().affiliate("a"));
        assert_eq!(series.profit, vec![10.0]);
        assert!(monthly_series(&[], &AnalyticsFilter::all()).is_empty());
    }

    #[test]
    fn payments_become_paid_out_cost() {
        let rows = vec![
            PaymentRow {
                affiliate: None,
                date: NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
                amount: 40.0,
                currency: None,
                status: None,
            },
            PaymentRow {
                affiliate: None,
                date: NaiveDate::from_ymd_opt(2024, 5, 20).unwrap(),
                amount: -10.0,
                currency: None,
                status: None,
            },
        ];
        let series = payment_series(&rows, &AnalyticsFilter::all());
        assert_eq!(series.labels, vec!["2024-05"]);
        assert_eq!(series.cost, vec![50.0]);
    }
}
