use serde::{Deserialize, Serialize};

use crate::metric::{FieldRole, FieldSpec, MetricRecord, field_with_role};

/// Minimum history length for a trend fit.
pub const TREND_MIN_HISTORY: usize = 3;

/// Duration slope above which the trend counts as moving, in ms per build.
const DURATION_SLOPE_THRESHOLD_MS: f64 = 100.0;
/// Coverage slope above which the trend counts as moving, in points per build.
const COVERAGE_SLOPE_THRESHOLD_PCT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageDirection {
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationTrend {
    pub slope: f64,
    pub direction: DurationDirection,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageTrend {
    pub slope: f64,
    pub direction: CoverageDirection,
    pub message: String,
}

/// Longitudinal trend over the full history. A line is present only when the
/// domain tracks a field with the corresponding role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub duration: Option<DurationTrend>,
    pub coverage: Option<CoverageTrend>,
}

/// Fit linear trends over the full (not windowed) historical sequence.
/// Returns `None` when fewer than [`TREND_MIN_HISTORY`] records exist.
pub fn analyze_trend(history: &[MetricRecord], fields: &[FieldSpec]) -> Option<Trend> {
    if history.len() < TREND_MIN_HISTORY {
        return None;
    }

    let duration = field_with_role(fields, FieldRole::TotalDuration).map(|spec| {
        let slope = ols_slope(&series(history, spec.name));
        let direction = if slope > DURATION_SLOPE_THRESHOLD_MS {
            DurationDirection::Increasing
        } else if slope < -DURATION_SLOPE_THRESHOLD_MS {
            DurationDirection::Decreasing
        } else {
            DurationDirection::Stable
        };
        DurationTrend {
            slope,
            direction,
            message: duration_message(direction).to_owned(),
        }
    });

    let coverage = field_with_role(fields, FieldRole::Coverage).map(|spec| {
        let slope = ols_slope(&series(history, spec.name));
        let direction = if slope > COVERAGE_SLOPE_THRESHOLD_PCT {
            CoverageDirection::Improving
        } else if slope < -COVERAGE_SLOPE_THRESHOLD_PCT {
            CoverageDirection::Declining
        } else {
            CoverageDirection::Stable
        };
        CoverageTrend {
            slope,
            direction,
            message: coverage_message(direction).to_owned(),
        }
    });

    Some(Trend { duration, coverage })
}

fn series(history: &[MetricRecord], field: &str) -> Vec<f64> {
    history.iter().map(|record| record.get(field)).collect()
}

/// Ordinary least-squares slope of `value` against the build index.
/// Degenerate samples (fewer than 2 points, or a vertical denominator)
/// yield slope 0.
fn ols_slope(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }

    let n = values.len() as f64;
    let sum_x = (0..values.len()).map(|index| index as f64).sum::<f64>();
    let sum_y = values.iter().sum::<f64>();
    let sum_xy = values
        .iter()
        .enumerate()
        .map(|(index, value)| index as f64 * value)
        .sum::<f64>();
    let sum_x_squared = (0..values.len())
        .map(|index| (index as f64) * (index as f64))
        .sum::<f64>();

    let denominator = n * sum_x_squared - sum_x * sum_x;
    if denominator == 0.0 {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denominator
}

fn duration_message(direction: DurationDirection) -> &'static str {
    match direction {
        DurationDirection::Increasing => "Build duration is trending up across recent builds",
        DurationDirection::Decreasing => "Build duration is trending down across recent builds",
        DurationDirection::Stable => "Build duration is stable across recent builds",
    }
}

fn coverage_message(direction: CoverageDirection) -> &'static str {
    match direction {
        CoverageDirection::Improving => "Coverage is improving across recent builds",
        CoverageDirection::Declining => "Coverage is declining across recent builds",
        CoverageDirection::Stable => "Coverage is stable across recent builds",
    }
}

#[cfg(test)]
mod tests {
    use crate::metric::{FieldKind, FieldRole, FieldSpec, MetricRecord};

    use super::*;

    const FIELDS: &[FieldSpec] = &[
        FieldSpec::new("totalDuration", FieldKind::DurationMs)
            .with_role(FieldRole::TotalDuration),
        FieldSpec::new("coverage", FieldKind::Percent).with_role(FieldRole::Coverage),
    ];

    fn history(durations: &[f64]) -> Vec<MetricRecord> {
        durations
            .iter()
            .map(|duration| {
                let mut record = MetricRecord::default();
                record.set("totalDuration", *duration);
                record.set("coverage", 80.0);
                record
            })
            .collect()
    }

    #[test]
    fn short_history_yields_no_trend() {
        assert_eq!(analyze_trend(&history(&[1_000.0, 1_200.0]), FIELDS), None);
    }

    #[test]
    fn strictly_increasing_durations_trend_increasing() {
        let records = history(&[1_000.0, 1_200.0, 1_400.0, 1_600.0]);
        let trend = analyze_trend(&records, FIELDS).expect("trend");
        let duration = trend.duration.expect("duration line");

        assert!((duration.slope - 200.0).abs() < 1e-9);
        assert_eq!(duration.direction, DurationDirection::Increasing);
    }

    #[test]
    fn slope_inside_the_band_is_stable() {
        // exactly 100 ms per build sits on the threshold, not over it
        let records = history(&[1_000.0, 1_100.0, 1_200.0, 1_300.0, 1_400.0]);
        let trend = analyze_trend(&records, FIELDS).expect("trend");
        let duration = trend.duration.expect("duration line");
        assert!((duration.slope - 100.0).abs() < 1e-9);
        assert_eq!(duration.direction, DurationDirection::Stable);
    }

    #[test]
    fn strictly_decreasing_durations_trend_decreasing() {
        let records = history(&[2_000.0, 1_700.0, 1_400.0, 1_100.0]);
        let trend = analyze_trend(&records, FIELDS).expect("trend");
        let duration = trend.duration.expect("duration line");
        assert!(duration.slope < -100.0);
        assert_eq!(duration.direction, DurationDirection::Decreasing);
    }

    #[test]
    fn constant_durations_have_zero_slope_and_stable_direction() {
        let records = history(&[1_500.0, 1_500.0, 1_500.0, 1_500.0]);
        let trend = analyze_trend(&records, FIELDS).expect("trend");
        let duration = trend.duration.expect("duration line");
        assert_eq!(duration.slope, 0.0);
        assert_eq!(duration.direction, DurationDirection::Stable);
    }

    #[test]
    fn coverage_direction_uses_the_half_point_threshold() {
        let mut records = history(&[1_000.0, 1_000.0, 1_000.0, 1_000.0]);
        for (index, record) in records.iter_mut().enumerate() {
            record.set("coverage", 90.0 - index as f64); // -1 point per build
        }
        let trend = analyze_trend(&records, FIELDS).expect("trend");
        let coverage = trend.coverage.expect("coverage line");
        assert!(coverage.slope < -COVERAGE_SLOPE_THRESHOLD_PCT);
        assert_eq!(coverage.direction, CoverageDirection::Declining);
        assert_eq!(
            coverage.message,
            "Coverage is declining across recent builds"
        );
    }

    #[test]
    fn domains_without_a_role_omit_that_line() {
        const DURATION_ONLY: &[FieldSpec] = &[FieldSpec::new(
            "duration",
            FieldKind::DurationMs,
        )
        .with_role(FieldRole::TotalDuration)];

        let mut records = Vec::new();
        for index in 0..4 {
            let mut record = MetricRecord::default();
            record.set("duration", 1_000.0 + index as f64);
            records.push(record);
        }

        let trend = analyze_trend(&records, DURATION_ONLY).expect("trend");
        assert!(trend.duration.is_some());
        assert!(trend.coverage.is_none());
    }
}
