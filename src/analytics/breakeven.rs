use serde::Serialize;

use super::series::MonthlySeries;

/// Cumulative `profit - cost` over a monthly series.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BreakEvenCurve {
    /// Aligned with the series; `None` before `effective_start`.
    pub curve: Vec<Option<f64>>,
    /// First month at or after the selection start with any activity.
    pub effective_start: Option<usize>,
    /// Offset from `effective_start` of the first non-negative cumulative value.
    pub break_even_index: Option<usize>,
    pub break_even_months: Option<usize>,
    /// Last defined cumulative value, the current net position.
    pub last_cumulative: Option<f64>,
}

/// Break-even over a [`MonthlySeries`] starting at `start`.
pub fn break_even(series: &MonthlySeries, start: usize) -> BreakEvenCurve {
    break_even_curve(&series.users, &series.profit, &series.cost, start)
}

/// Leading months where users, profit and cost are all zero are skipped.
/// Series of unequal length are cut to the shortest of `profit` and `cost`;
/// a missing `users` entry counts as zero.
pub fn break_even_curve(users: &[f64], profit: &[f64], cost: &[f64], start: usize) -> BreakEvenCurve {
    let len = profit.len().min(cost.len());
    let mut curve = vec![None; len];

    let active = |i: usize| {
        users.get(i).copied().unwrap_or(0.0) != 0.0 || profit[i] != 0.0 || cost[i] != 0.0
    };
    let Some(effective_start) = (start..len).find(|&i| active(i)) else {
        return BreakEvenCurve {
            curve,
            ..BreakEvenCurve::default()
        };
    };

    let mut cumulative = 0.0;
    let mut break_even_index = None;
    for i in effective_start..len {
        cumulative += profit[i] - cost[i];
        curve[i] = Some(cumulative);
        if break_even_index.is_none() && cumulative >= 0.0 {
            break_even_index = Some(i - effective_start);
        }
    }

    BreakEvenCurve {
        last_cumulative: curve.iter().rev().find_map(|v| *v),
        curve,
        effective_start: Some(effective_start),
        break_even_months: break_even_index.map(|i| i + 1),
        break_even_index,
    }
}
