use std::collections::BTreeMap;

use pulse_config::AnalysisConfig;
use serde::{Deserialize, Serialize};

use crate::baseline::Baseline;
use crate::metric::{FieldKind, FieldSpec, MetricRecord};

/// Three-way classification of a current metric against its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Regression,
    Improvement,
    Stable,
}

/// Per-field comparison outcome. `change` is a percent change for duration
/// and count fields, and an absolute point difference for percent fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldComparison {
    pub current: f64,
    pub baseline: f64,
    pub ratio: f64,
    pub change: f64,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub has_baseline: bool,
    pub fields: BTreeMap<String, FieldComparison>,
}

impl Comparison {
    pub fn field(&self, name: &str) -> Option<&FieldComparison> {
        self.fields.get(name)
    }

    pub fn status(&self, name: &str) -> Option<Status> {
        self.fields.get(name).map(|field| field.status)
    }
}

/// Compare a current record to its baseline. Without a baseline no field
/// comparisons are computed; callers branch on `has_baseline`.
///
/// Duration and count fields classify by ratio against the configured
/// thresholds (both boundaries inclusive). Percent fields classify by direct
/// inequality against the baseline mean. The asymmetry is deliberate: a
/// coverage drop of any size is a regression, while durations are allowed to
/// jitter inside the ratio band.
pub fn compare(
    current: &MetricRecord,
    baseline: Option<&Baseline>,
    fields: &[FieldSpec],
    config: &AnalysisConfig,
) -> Comparison {
    let Some(baseline) = baseline else {
        return Comparison {
            has_baseline: false,
            fields: BTreeMap::new(),
        };
    };

    let mut compared = BTreeMap::new();
    for spec in fields {
        let current_value = current.get(spec.name);
        let baseline_value = baseline.mean(spec.name);
        let ratio = guarded_ratio(current_value, baseline_value);

        let (change, status) = match spec.kind {
            FieldKind::Percent => {
                let difference = current_value - baseline_value;
                let status = if current_value < baseline_value {
                    Status::Regression
                } else if current_value > baseline_value {
                    Status::Improvement
                } else {
                    Status::Stable
                };
                (difference, status)
            }
            FieldKind::DurationMs | FieldKind::Count => {
                let change = if baseline_value > 0.0 {
                    (current_value - baseline_value) / baseline_value * 100.0
                } else {
                    0.0
                };
                let status = if ratio >= config.regression_threshold {
                    Status::Regression
                } else if ratio <= config.improvement_threshold {
                    Status::Improvement
                } else {
                    Status::Stable
                };
                (change, status)
            }
        };

        compared.insert(
            spec.name.to_owned(),
            FieldComparison {
                current: current_value,
                baseline: baseline_value,
                ratio,
                change,
                status,
            },
        );
    }

    Comparison {
        has_baseline: true,
        fields: compared,
    }
}

/// `current / baseline`, defined as 1 when the baseline is 0.
///
/// Note the guard also reports ratio 1 (and therefore Stable) when the
/// baseline is legitimately zero, e.g. a metric that only just started being
/// recorded. Preserved for compatibility with the upstream contract.
fn guarded_ratio(current: f64, baseline: f64) -> f64 {
    if baseline > 0.0 { current / baseline } else { 1.0 }
}
