use pulse_config::AnalysisConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::metric::{FieldKind, FieldRole, FieldSpec, MetricRecord, num_field, timestamp_field};
use crate::pipeline::{Analyzer, Domain};
use crate::recommend::Recommendation;

/// Analyzer over per-build timing and summary metrics.
pub type BuildAnalyzer = Analyzer<BuildDomain>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildDomain;

/// Build records carry no detail beyond the canonical metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BuildDetail {}

const BUILD_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("totalDuration", FieldKind::DurationMs).with_role(FieldRole::TotalDuration),
    FieldSpec::new("testDuration", FieldKind::DurationMs),
    FieldSpec::new("buildDuration", FieldKind::DurationMs),
    FieldSpec::new("lintDuration", FieldKind::DurationMs),
    FieldSpec::new("installDuration", FieldKind::DurationMs),
    FieldSpec::new("testsRun", FieldKind::Count).with_role(FieldRole::TestCount),
    FieldSpec::new("testsPassed", FieldKind::Count),
    FieldSpec::new("testsFailed", FieldKind::Count),
    FieldSpec::new("coverage", FieldKind::Percent).with_role(FieldRole::Coverage),
];

impl Domain for BuildDomain {
    type Extras = BuildDetail;

    const NAME: &'static str = "build";
    const FIELDS: &'static [FieldSpec] = BUILD_FIELDS;

    fn extract(raw: &Value) -> (MetricRecord, BuildDetail) {
        let mut record = MetricRecord {
            timestamp: timestamp_field(raw, "timestamp"),
            ..MetricRecord::default()
        };
        for spec in BUILD_FIELDS {
            record.set(spec.name, num_field(raw, spec.name));
        }
        (record, BuildDetail::default())
    }

    fn recommend(
        _record: &MetricRecord,
        _extras: &BuildDetail,
        _config: &AnalysisConfig,
    ) -> Vec<Recommendation> {
        // the build domain has no rules beyond the shared set
        Vec::new()
    }
}
