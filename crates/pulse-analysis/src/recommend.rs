use pulse_core::Severity;
use serde::{Deserialize, Serialize};

use crate::compare::{Comparison, Status};
use crate::metric::{FieldRole, FieldSpec, field_with_role};
use crate::trend::{CoverageDirection, DurationDirection, Trend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    PerformanceRegression,
    CoverageRegression,
    DurationTrend,
    CoverageTrend,
    FailureRate,
    VerySlowTests,
    SlowTests,
    TimeoutFailures,
    ConnectionFailures,
    LineCoverage,
    BranchCoverage,
    FunctionCoverage,
    StatementCoverage,
    LowCoverageFiles,
    UncoveredFunctions,
}

/// An actionable finding. Emitted in fixed evaluation order
/// (comparison-derived, then trend-derived, then domain-specific); rules
/// never suppress each other and each rule emits at most once per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub severity: Severity,
    pub kind: RecommendationKind,
    pub message: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<String>,
}

impl Recommendation {
    pub fn new(
        severity: Severity,
        kind: RecommendationKind,
        message: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            action: action.into(),
            evidence: Vec::new(),
        }
    }

    pub fn with_evidence(mut self, evidence: Vec<String>) -> Self {
        self.evidence = evidence;
        self
    }
}

/// Recommendations every domain shares: regressions found by the comparator
/// and adverse longitudinal trends. Domain-specific rules are appended by
/// the [`Domain`](crate::pipeline::Domain) implementation afterwards.
pub(crate) fn shared_recommendations(
    comparison: &Comparison,
    trend: Option<&Trend>,
    fields: &[FieldSpec],
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if let Some(spec) = field_with_role(fields, FieldRole::TotalDuration)
        && let Some(field) = comparison.field(spec.name)
        && field.status == Status::Regression
    {
        recommendations.push(Recommendation::new(
            Severity::High,
            RecommendationKind::PerformanceRegression,
            format!(
                "Total duration regressed {:.1}% against the baseline ({:.0} ms vs {:.0} ms)",
                field.change, field.current, field.baseline
            ),
            "Profile the slowest pipeline stages and review recently added steps or dependencies",
        ));
    }

    if let Some(spec) = field_with_role(fields, FieldRole::Coverage)
        && let Some(field) = comparison.field(spec.name)
        && field.status == Status::Regression
    {
        recommendations.push(Recommendation::new(
            Severity::Medium,
            RecommendationKind::CoverageRegression,
            format!(
                "Coverage fell {:.1} points below the baseline ({:.1}% vs {:.1}%)",
                -field.change, field.current, field.baseline
            ),
            "Add tests covering recently changed code paths",
        ));
    }

    if let Some(trend) = trend {
        if let Some(duration) = &trend.duration
            && duration.direction == DurationDirection::Increasing
        {
            recommendations.push(Recommendation::new(
                Severity::Medium,
                RecommendationKind::DurationTrend,
                format!(
                    "Build duration is trending up by about {:.0} ms per build",
                    duration.slope
                ),
                "Audit caching and incremental behavior of the slowest pipeline stages",
            ));
        }

        if let Some(coverage) = &trend.coverage
            && coverage.direction == CoverageDirection::Declining
        {
            recommendations.push(Recommendation::new(
                Severity::High,
                RecommendationKind::CoverageTrend,
                format!(
                    "Coverage is trending down by about {:.1} points per build",
                    -coverage.slope
                ),
                "Enforce coverage checks on new changes to stop the decline",
            ));
        }
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pulse_config::AnalysisConfig;
    use pulse_core::Severity;

    use crate::baseline::Baseline;
    use crate::compare::compare;
    use crate::metric::{FieldKind, FieldRole, FieldSpec, MetricRecord};
    use crate::trend::{
        CoverageDirection, CoverageTrend, DurationDirection, DurationTrend, Trend,
    };

    use super::*;

    const FIELDS: &[FieldSpec] = &[
        FieldSpec::new("totalDuration", FieldKind::DurationMs)
            .with_role(FieldRole::TotalDuration),
        FieldSpec::new("coverage", FieldKind::Percent).with_role(FieldRole::Coverage),
    ];

    fn comparison(duration: f64, coverage: f64) -> Comparison {
        let mut means = BTreeMap::new();
        means.insert("totalDuration".to_owned(), 1_000.0);
        means.insert("coverage".to_owned(), 80.0);
        let baseline = Baseline {
            means,
            p95: BTreeMap::new(),
            sample_size: 10,
        };
        let mut record = MetricRecord::default();
        record.set("totalDuration", duration);
        record.set("coverage", coverage);
        compare(&record, Some(&baseline), FIELDS, &AnalysisConfig::default())
    }

    #[test]
    fn duration_regression_yields_high_performance_recommendation() {
        let recommendations = shared_recommendations(&comparison(1_800.0, 80.0), None, FIELDS);
        assert_eq!(recommendations.len(), 1);
        assert_eq!(
            recommendations[0].kind,
            RecommendationKind::PerformanceRegression
        );
        assert_eq!(recommendations[0].severity, Severity::High);
        assert!(recommendations[0].message.contains("80.0%"));
    }

    #[test]
    fn coverage_regression_yields_medium_recommendation() {
        let recommendations = shared_recommendations(&comparison(1_000.0, 70.0), None, FIELDS);
        assert_eq!(recommendations.len(), 1);
        assert_eq!(
            recommendations[0].kind,
            RecommendationKind::CoverageRegression
        );
        assert_eq!(recommendations[0].severity, Severity::Medium);
        assert!(recommendations[0].message.contains("10.0 points"));
    }

    #[test]
    fn adverse_trends_append_after_comparison_findings() {
        let trend = Trend {
            duration: Some(DurationTrend {
                slope: 250.0,
                direction: DurationDirection::Increasing,
                message: String::new(),
            }),
            coverage: Some(CoverageTrend {
                slope: -1.2,
                direction: CoverageDirection::Declining,
                message: String::new(),
            }),
        };

        let recommendations =
            shared_recommendations(&comparison(1_800.0, 70.0), Some(&trend), FIELDS);

        let kinds = recommendations
            .iter()
            .map(|recommendation| recommendation.kind)
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                RecommendationKind::PerformanceRegression,
                RecommendationKind::CoverageRegression,
                RecommendationKind::DurationTrend,
                RecommendationKind::CoverageTrend,
            ]
        );
    }

    #[test]
    fn stable_comparison_and_trend_yield_nothing() {
        let trend = Trend {
            duration: Some(DurationTrend {
                slope: 10.0,
                direction: DurationDirection::Stable,
                message: String::new(),
            }),
            coverage: None,
        };
        let recommendations =
            shared_recommendations(&comparison(1_000.0, 80.0), Some(&trend), FIELDS);
        assert!(recommendations.is_empty());
    }
}
