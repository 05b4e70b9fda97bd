use serde::Serialize;

use super::retention::{Checkpoints, RetentionSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Health {
    Green,
    Orange,
    Red,
    NoData,
}

pub const REASON_SUSTAINS: &str = "value sustains beyond month 0";
pub const REASON_FRONT_LOADED: &str = "most value generated in month 0";
pub const REASON_SHARP_DROP: &str = "value drops sharply after month 0";
pub const REASON_FADES: &str = "value fades quickly by month 3";
pub const REASON_DECLINE: &str = "value declines steadily over time";
pub const REASON_NO_DATA: &str = "not enough cohort data";

/// Everything the classifier looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HealthInputs {
    pub m1: Option<f64>,
    pub m3: Option<f64>,
    pub m6: Option<f64>,
    pub half_life: Option<usize>,
    pub lifetime: Option<usize>,
    pub early_value_share: Option<f64>,
}

impl HealthInputs {
    pub fn new(checkpoints: &Checkpoints, summary: &RetentionSummary) -> Self {
        Self {
            m1: checkpoints.m1,
            m3: checkpoints.m3,
            m6: checkpoints.m6,
            half_life: summary.half_life,
            lifetime: summary.lifetime,
            early_value_share: summary.early_value_share,
        }
    }

    fn is_empty(&self) -> bool {
        self.m1.is_none()
            && self.m3.is_none()
            && self.m6.is_none()
            && self.half_life.is_none()
            && self.lifetime.is_none()
            && self.early_value_share.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub health: Health,
    pub reason: &'static str,
}

fn at_least(v: Option<f64>, threshold: f64) -> bool {
    v.is_some_and(|v| v >= threshold)
}

fn below(v: Option<f64>, threshold: f64) -> bool {
    v.is_some_and(|v| v < threshold)
}

fn offset_at_least(v: Option<usize>, threshold: usize) -> bool {
    v.is_some_and(|v| v >= threshold)
}

pub fn classify(inputs: &HealthInputs) -> HealthReport {
    if inputs.is_empty() {
        return HealthReport {
            health: Health::NoData,
            reason: REASON_NO_DATA,
        };
    }

    let health = if at_least(inputs.m3, 40.0)
        || offset_at_least(inputs.half_life, 3)
        || offset_at_least(inputs.lifetime, 6)
    {
        Health::Green
    } else if at_least(inputs.m3, 20.0)
        || offset_at_least(inputs.half_life, 2)
        || offset_at_least(inputs.lifetime, 4)
    {
        Health::Orange
    } else {
        Health::Red
    };

    let reason = if health == Health::Green {
        REASON_SUSTAINS
    } else if at_least(inputs.early_value_share, 60.0) {
        REASON_FRONT_LOADED
    } else if below(inputs.m1, 25.0) {
        REASON_SHARP_DROP
    } else if below(inputs.m3, 20.0) {
        REASON_FADES
    } else {
        REASON_DECLINE
    };

    HealthReport { health, reason }
}
