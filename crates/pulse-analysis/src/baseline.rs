use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::metric::{FieldKind, FieldSpec, MetricRecord};

/// Aggregate statistics over the most recent window of historical records:
/// mean per tracked field, 95th percentile per duration field, and the
/// sample size used. Absent entirely (`None` from [`compute_baseline`]) when
/// history is empty — an all-zero baseline would silently classify every
/// comparison as a regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub means: BTreeMap<String, f64>,
    pub p95: BTreeMap<String, f64>,
    pub sample_size: usize,
}

impl Baseline {
    pub fn mean(&self, field: &str) -> f64 {
        self.means.get(field).copied().unwrap_or(0.0)
    }

    pub fn p95(&self, field: &str) -> f64 {
        self.p95.get(field).copied().unwrap_or(0.0)
    }
}

/// Reduce the last `window` historical records (all, if fewer) into a
/// [`Baseline`]. History is ordered oldest-to-newest.
pub fn compute_baseline(
    history: &[MetricRecord],
    fields: &[FieldSpec],
    window: usize,
) -> Option<Baseline> {
    if history.is_empty() {
        return None;
    }

    let start = history.len().saturating_sub(window.max(1));
    let recent = &history[start..];

    let mut means = BTreeMap::new();
    let mut p95 = BTreeMap::new();

    for spec in fields {
        let mut values = recent
            .iter()
            .map(|record| record.get(spec.name))
            .collect::<Vec<_>>();

        let mean = values.iter().sum::<f64>() / values.len() as f64;
        means.insert(spec.name.to_owned(), mean);

        if spec.kind == FieldKind::DurationMs {
            values.sort_by(|left, right| {
                left.partial_cmp(right).unwrap_or(std::cmp::Ordering::Equal)
            });
            p95.insert(spec.name.to_owned(), percentile_95(&values));
        }
    }

    Some(Baseline {
        means,
        p95,
        sample_size: recent.len(),
    })
}

/// 95th percentile of an ascending-sorted sample: the value at index
/// `floor(0.95 * n)`, clamped to the last index.
fn percentile_95(sorted: &[f64]) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let index = ((sorted.len() as f64 * 0.95).floor() as usize).min(sorted.len() - 1);
    sorted[index]
}
