use serde::Serialize;

use super::align::AggregatedCohort;

/// Offsets reported as checkpoint averages.
pub const CHECKPOINTS: [usize; 3] = [1, 3, 6];

const HALF_LIFE_PCT: f64 = 50.0;
const LIFETIME_PCT: f64 = 10.0;

/// An aggregated cohort with its values as a percentage of month 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedCohort {
    #[serde(flatten)]
    pub cohort: AggregatedCohort,
    /// `None` where month 0 is zero or the value is undefined. Never negative.
    pub normalized: Vec<Option<f64>>,
    /// Offsets whose raw value is below zero.
    pub net_outflow: Vec<bool>,
}

impl NormalizedCohort {
    pub fn has_net_outflow(&self) -> bool {
        self.net_outflow.iter().any(|f| *f)
    }
}

pub fn normalize(cohort: AggregatedCohort) -> NormalizedCohort {
    let base = cohort.values.first().copied().filter(|b| b.is_finite() && *b != 0.0);

    let normalized = cohort
        .values
        .iter()
        .map(|&v| {
            let base = base?;
            if !v.is_finite() {
                return None;
            }
            if v < 0.0 {
                return Some(0.0);
            }
            Some((100.0 * v / base).max(0.0))
        })
        .collect();
    let net_outflow = cohort.values.iter().map(|v| *v < 0.0).collect();

    NormalizedCohort {
        cohort,
        normalized,
        net_outflow,
    }
}

/// Mean of the defined `normalized[offset]` entries, `None` if there are none.
pub fn checkpoint_average(cohorts: &[NormalizedCohort], offset: usize) -> Option<f64> {
    mean(cohorts.iter().filter_map(|c| c.normalized.get(offset).copied().flatten()))
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Checkpoints {
    pub m1: Option<f64>,
    pub m3: Option<f64>,
    pub m6: Option<f64>,
}

impl Checkpoints {
    pub fn of(cohorts: &[NormalizedCohort]) -> Self {
        let [m1, m3, m6] = CHECKPOINTS.map(|k| checkpoint_average(cohorts, k));
        Self { m1, m3, m6 }
    }

    pub fn is_empty(&self) -> bool {
        self.m1.is_none() && self.m3.is_none() && self.m6.is_none()
    }
}

/// Shape of the retention curve across the selected cohorts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetentionSummary {
    /// Mean retained % per offset across cohorts with a defined value there.
    pub curve: Vec<Option<f64>>,
    /// First offset where the mean curve drops below 50%.
    pub half_life: Option<usize>,
    /// First offset where the mean curve drops below 10%.
    pub lifetime: Option<usize>,
    /// Month-0 value as a percentage of all value, summed over cohorts.
    /// `None` unless some cohort has a non-zero month 0.
    pub early_value_share: Option<f64>,
    pub cohorts_with_net_outflow: usize,
}

impl RetentionSummary {
    pub fn of(cohorts: &[NormalizedCohort]) -> Self {
        let len = cohorts.iter().map(|c| c.normalized.len()).max().unwrap_or(0);
        let curve: Vec<Option<f64>> = (0..len).map(|i| checkpoint_average(cohorts, i)).collect();

        let first_below = |threshold: f64| {
            curve
                .iter()
                .enumerate()
                .skip(1)
                .find(|(_, v)| v.is_some_and(|v| v < threshold))
                .map(|(i, _)| i)
        };

        let any_base = cohorts
            .iter()
            .any(|c| c.normalized.first().copied().flatten().is_some());
        let early: f64 = cohorts
            .iter()
            .filter_map(|c| c.cohort.values.first())
            .sum();
        let total: f64 = cohorts.iter().flat_map(|c| c.cohort.values.iter()).sum();
        let early_value_share = (any_base && total > 0.0).then(|| 100.0 * early / total);

        Self {
            half_life: first_below(HALF_LIFE_PCT),
            lifetime: first_below(LIFETIME_PCT),
            early_value_share,
            cohorts_with_net_outflow: cohorts.iter().filter(|c| c.has_net_outflow()).count(),
            curve,
        }
    }
}
