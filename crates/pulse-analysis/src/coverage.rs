use pulse_config::AnalysisConfig;
use pulse_core::Severity;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::metric::{FieldKind, FieldRole, FieldSpec, MetricRecord, timestamp_field};
use crate::pipeline::{Analyzer, Domain};
use crate::recommend::{Recommendation, RecommendationKind};

/// Analyzer over code-coverage records.
pub type CoverageAnalyzer = Analyzer<CoverageDomain>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverageDomain;

/// A file averaging below this is called out by name.
const LOW_FILE_COVERAGE_PCT: f64 = 30.0;
/// More uncovered functions than this across the run draws a finding.
const UNCOVERED_FUNCTION_LIMIT: u32 = 10;

/// Per-file coverage percentages. `uncovered_functions` is only known for
/// instrumentation-shaped input; summary input reports 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileCoverage {
    pub path: String,
    pub lines: f64,
    pub branches: f64,
    pub functions: f64,
    pub statements: f64,
    pub uncovered_functions: u32,
}

impl FileCoverage {
    pub fn average(&self) -> f64 {
        (self.lines + self.branches + self.functions + self.statements) / 4.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CoverageDetail {
    pub files: Vec<FileCoverage>,
}

const COVERAGE_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("lines", FieldKind::Percent).with_role(FieldRole::Coverage),
    FieldSpec::new("branches", FieldKind::Percent),
    FieldSpec::new("functions", FieldKind::Percent),
    FieldSpec::new("statements", FieldKind::Percent),
];

/// The two raw shapes upstream collaborators deliver, resolved once at the
/// extraction boundary: a precomputed summary (`total.lines.pct`, ...) or a
/// raw per-file instrumentation map (`s`/`b`/`f` hit counts).
enum CoverageShape<'a> {
    Summary(&'a Map<String, Value>),
    Instrumentation(&'a Map<String, Value>),
}

fn resolve_shape(map: &Map<String, Value>) -> CoverageShape<'_> {
    let has_summary_total = map
        .get("total")
        .and_then(|total| total.get("lines"))
        .and_then(|lines| lines.get("pct"))
        .is_some();
    if has_summary_total {
        return CoverageShape::Summary(map);
    }

    let instrumented = map.values().any(|entry| {
        entry.get("s").is_some() || entry.get("f").is_some() || entry.get("statementMap").is_some()
    });
    if instrumented {
        CoverageShape::Instrumentation(map)
    } else {
        CoverageShape::Summary(map)
    }
}

/// Covered-vs-total instrumentation points. Percentage is defined as 0 when
/// nothing is instrumented, never NaN.
#[derive(Debug, Clone, Copy, Default)]
struct HitCounter {
    covered: u64,
    total: u64,
}

impl HitCounter {
    fn add_hits(&mut self, hits: f64) {
        self.total += 1;
        if hits > 0.0 {
            self.covered += 1;
        }
    }

    fn merge(&mut self, other: HitCounter) {
        self.covered += other.covered;
        self.total += other.total;
    }

    fn pct(self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 * self.covered as f64 / self.total as f64
        }
    }
}

fn pct_of(entry: &Value, metric: &str) -> f64 {
    entry
        .get(metric)
        .and_then(|metric| metric.get("pct"))
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
}

fn extract_summary(map: &Map<String, Value>) -> (MetricRecord, CoverageDetail) {
    let mut record = MetricRecord::default();
    let total = map.get("total").cloned().unwrap_or(Value::Null);
    record.set("lines", pct_of(&total, "lines"));
    record.set("branches", pct_of(&total, "branches"));
    record.set("functions", pct_of(&total, "functions"));
    record.set("statements", pct_of(&total, "statements"));

    let files = map
        .iter()
        .filter(|(path, entry)| path.as_str() != "total" && entry.is_object())
        .map(|(path, entry)| FileCoverage {
            path: path.clone(),
            lines: pct_of(entry, "lines"),
            branches: pct_of(entry, "branches"),
            functions: pct_of(entry, "functions"),
            statements: pct_of(entry, "statements"),
            uncovered_functions: 0,
        })
        .collect();

    (record, CoverageDetail { files })
}

fn count_map(entry: &Value, key: &str) -> HitCounter {
    let mut counter = HitCounter::default();
    if let Some(hits) = entry.get(key).and_then(Value::as_object) {
        for value in hits.values() {
            match value {
                // branch maps hold one count per branch arm
                Value::Array(arms) => {
                    for arm in arms {
                        counter.add_hits(arm.as_f64().unwrap_or(0.0));
                    }
                }
                other => counter.add_hits(other.as_f64().unwrap_or(0.0)),
            }
        }
    }
    counter
}

fn uncovered_functions(entry: &Value) -> u32 {
    entry
        .get("f")
        .and_then(Value::as_object)
        .map(|functions| {
            functions
                .values()
                .filter(|hits| hits.as_f64().unwrap_or(0.0) == 0.0)
                .count() as u32
        })
        .unwrap_or(0)
}

fn extract_instrumentation(map: &Map<String, Value>) -> (MetricRecord, CoverageDetail) {
    let mut statements_all = HitCounter::default();
    let mut branches_all = HitCounter::default();
    let mut functions_all = HitCounter::default();
    let mut files = Vec::new();

    for (path, entry) in map {
        // a "total" pseudo-entry is aggregate data, not a file
        if path == "total" || !entry.is_object() {
            continue;
        }

        let statements = count_map(entry, "s");
        let branches = count_map(entry, "b");
        let functions = count_map(entry, "f");

        files.push(FileCoverage {
            path: path.clone(),
            // line coverage is derived from statement instrumentation points
            lines: statements.pct(),
            branches: branches.pct(),
            functions: functions.pct(),
            statements: statements.pct(),
            uncovered_functions: uncovered_functions(entry),
        });

        statements_all.merge(statements);
        branches_all.merge(branches);
        functions_all.merge(functions);
    }

    let mut record = MetricRecord::default();
    record.set("lines", statements_all.pct());
    record.set("branches", branches_all.pct());
    record.set("functions", functions_all.pct());
    record.set("statements", statements_all.pct());

    (record, CoverageDetail { files })
}

impl Domain for CoverageDomain {
    type Extras = CoverageDetail;

    const NAME: &'static str = "coverage";
    const FIELDS: &'static [FieldSpec] = COVERAGE_FIELDS;

    fn extract(raw: &Value) -> (MetricRecord, CoverageDetail) {
        let timestamp = timestamp_field(raw, "timestamp");
        let Some(map) = raw.as_object() else {
            let mut record = MetricRecord {
                timestamp,
                ..MetricRecord::default()
            };
            for spec in COVERAGE_FIELDS {
                record.set(spec.name, 0.0);
            }
            return (record, CoverageDetail::default());
        };

        let (mut record, detail) = match resolve_shape(map) {
            CoverageShape::Summary(map) => extract_summary(map),
            CoverageShape::Instrumentation(map) => extract_instrumentation(map),
        };
        record.timestamp = timestamp;
        (record, detail)
    }

    fn recommend(
        record: &MetricRecord,
        extras: &CoverageDetail,
        config: &AnalysisConfig,
    ) -> Vec<Recommendation> {
        let mut recommendations = Vec::new();

        let lines = record.get("lines");
        if lines < config.line_threshold {
            recommendations.push(Recommendation::new(
                Severity::High,
                RecommendationKind::LineCoverage,
                format!(
                    "Line coverage {lines:.1}% is below the {:.0}% threshold",
                    config.line_threshold
                ),
                "Add tests for the least-covered modules until line coverage clears the threshold",
            ));
        }

        let branches = record.get("branches");
        if branches < config.branch_threshold {
            recommendations.push(Recommendation::new(
                Severity::Medium,
                RecommendationKind::BranchCoverage,
                format!(
                    "Branch coverage {branches:.1}% is below the {:.0}% threshold",
                    config.branch_threshold
                ),
                "Cover the untested conditional branches, starting with error paths",
            ));
        }

        let functions = record.get("functions");
        if functions < config.function_threshold {
            recommendations.push(Recommendation::new(
                Severity::Medium,
                RecommendationKind::FunctionCoverage,
                format!(
                    "Function coverage {functions:.1}% is below the {:.0}% threshold",
                    config.function_threshold
                ),
                "Exercise the uncalled functions or delete dead code",
            ));
        }

        let statements = record.get("statements");
        if statements < config.statement_threshold {
            recommendations.push(Recommendation::new(
                Severity::Medium,
                RecommendationKind::StatementCoverage,
                format!(
                    "Statement coverage {statements:.1}% is below the {:.0}% threshold",
                    config.statement_threshold
                ),
                "Add tests for the least-covered statements",
            ));
        }

        let low_files = extras
            .files
            .iter()
            .filter(|file| file.average() < LOW_FILE_COVERAGE_PCT)
            .map(|file| file.path.clone())
            .collect::<Vec<_>>();
        if !low_files.is_empty() {
            recommendations.push(
                Recommendation::new(
                    Severity::High,
                    RecommendationKind::LowCoverageFiles,
                    format!(
                        "{} file(s) average below {LOW_FILE_COVERAGE_PCT:.0}% coverage",
                        low_files.len()
                    ),
                    "Prioritize tests for the named files; they are effectively untested",
                )
                .with_evidence(low_files),
            );
        }

        let uncovered = extras
            .files
            .iter()
            .map(|file| file.uncovered_functions)
            .sum::<u32>();
        if uncovered > UNCOVERED_FUNCTION_LIMIT {
            recommendations.push(Recommendation::new(
                Severity::Medium,
                RecommendationKind::UncoveredFunctions,
                format!("{uncovered} functions are never called by any test"),
                "Walk the uncovered-function list and add at least a smoke test per function",
            ));
        }

        recommendations
    }
}
