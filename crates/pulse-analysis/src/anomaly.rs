use pulse_config::AnomalyThresholds;
use pulse_core::Severity;
use serde::{Deserialize, Serialize};

use crate::baseline::Baseline;
use crate::metric::{FieldRole, FieldSpec, MetricRecord, field_with_role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    DurationSpike,
    TestCountIncrease,
    TestCountDecrease,
    CoverageDrop,
}

/// A single-build deviation from baseline flagged by a heuristic rule.
/// `expected` is the baseline-side value the rule compared against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub severity: Severity,
    pub message: String,
    pub expected: f64,
    pub actual: f64,
}

/// Evaluate the heuristic anomaly rules against baseline and current record.
/// Every rule is independent; all may fire in one call. Without a baseline
/// the result is empty — insufficient history, not an error.
pub fn detect_anomalies(
    current: &MetricRecord,
    baseline: Option<&Baseline>,
    fields: &[FieldSpec],
    thresholds: &AnomalyThresholds,
) -> Vec<Anomaly> {
    let Some(baseline) = baseline else {
        return Vec::new();
    };

    let mut anomalies = Vec::new();

    if let Some(spec) = field_with_role(fields, FieldRole::TotalDuration) {
        let actual = current.get(spec.name);
        let p95 = baseline.p95(spec.name);
        if actual > p95 * thresholds.duration_spike_ratio {
            anomalies.push(Anomaly {
                kind: AnomalyKind::DurationSpike,
                severity: Severity::High,
                message: format!(
                    "duration {actual:.0} ms spiked past {:.0}% of the p95 baseline ({p95:.0} ms)",
                    thresholds.duration_spike_ratio * 100.0
                ),
                expected: p95,
                actual,
            });
        }
    }

    if let Some(spec) = field_with_role(fields, FieldRole::TestCount) {
        let actual = current.get(spec.name);
        let mean = baseline.mean(spec.name);
        if (actual - mean).abs() > mean * thresholds.test_count_delta {
            let kind = if actual > mean {
                AnomalyKind::TestCountIncrease
            } else {
                AnomalyKind::TestCountDecrease
            };
            anomalies.push(Anomaly {
                kind,
                severity: Severity::Medium,
                message: format!(
                    "test count {actual:.0} moved more than {:.0}% away from the baseline average {mean:.1}",
                    thresholds.test_count_delta * 100.0
                ),
                expected: mean,
                actual,
            });
        }
    }

    if let Some(spec) = field_with_role(fields, FieldRole::Coverage) {
        let actual = current.get(spec.name);
        let mean = baseline.mean(spec.name);
        if actual < mean - thresholds.coverage_drop_points {
            anomalies.push(Anomaly {
                kind: AnomalyKind::CoverageDrop,
                severity: Severity::High,
                message: format!(
                    "coverage {actual:.1}% dropped more than {:.1} points below the baseline average {mean:.1}%",
                    thresholds.coverage_drop_points
                ),
                expected: mean,
                actual,
            });
        }
    }

    anomalies
}
