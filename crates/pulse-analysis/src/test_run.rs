use pulse_config::AnalysisConfig;
use pulse_core::{FailureCategory, Severity};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::metric::{FieldKind, FieldRole, FieldSpec, MetricRecord, num_field, timestamp_field};
use crate::pipeline::{Analyzer, AnalysisError, Domain};
use crate::recommend::{Recommendation, RecommendationKind};

/// Analyzer over test-runner result records.
pub type TestRunAnalyzer = Analyzer<TestRunDomain>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestRunDomain;

/// More than this many slow (but not very slow) tests draws a finding.
const SLOW_TEST_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Passed,
    Failed,
    Pending,
    Skipped,
    Unknown,
}

impl TestStatus {
    fn from_raw(status: &str) -> Self {
        match status {
            "passed" => Self::Passed,
            "failed" => Self::Failed,
            "pending" | "todo" => Self::Pending,
            "skipped" | "disabled" => Self::Skipped,
            _ => Self::Unknown,
        }
    }
}

/// One flattened test case from the nested per-suite structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseRecord {
    pub suite: String,
    pub name: String,
    pub status: TestStatus,
    pub duration_ms: f64,
    pub failure_messages: Vec<String>,
    /// Present only for failed cases.
    pub failure_category: Option<FailureCategory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TestRunDetail {
    pub cases: Vec<TestCaseRecord>,
}

const TEST_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("totalTests", FieldKind::Count).with_role(FieldRole::TestCount),
    FieldSpec::new("passedTests", FieldKind::Count),
    FieldSpec::new("failedTests", FieldKind::Count),
    FieldSpec::new("pendingTests", FieldKind::Count),
    FieldSpec::new("totalSuites", FieldKind::Count),
    FieldSpec::new("passedSuites", FieldKind::Count),
    FieldSpec::new("failedSuites", FieldKind::Count),
    FieldSpec::new("duration", FieldKind::DurationMs).with_role(FieldRole::TotalDuration),
];

/// Per-suite runtime: `perfStats.runtime`, or `end - start` when no direct
/// runtime field is present.
fn suite_runtime(suite: &Value) -> f64 {
    let Some(perf) = suite.get("perfStats") else {
        return 0.0;
    };
    if let Some(runtime) = perf.get("runtime").and_then(Value::as_f64) {
        return runtime;
    }
    let start = perf.get("start").and_then(Value::as_f64).unwrap_or(0.0);
    let end = perf.get("end").and_then(Value::as_f64).unwrap_or(0.0);
    (end - start).max(0.0)
}

fn string_field(raw: &Value, key: &str) -> String {
    raw.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

fn flatten_case(suite_name: &str, case: &Value) -> TestCaseRecord {
    let name = case
        .get("fullName")
        .and_then(Value::as_str)
        .or_else(|| case.get("title").and_then(Value::as_str))
        .unwrap_or_default()
        .to_owned();

    let status = TestStatus::from_raw(
        case.get("status").and_then(Value::as_str).unwrap_or_default(),
    );

    let failure_messages = case
        .get("failureMessages")
        .and_then(Value::as_array)
        .map(|messages| {
            messages
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let failure_category = (status == TestStatus::Failed)
        .then(|| FailureCategory::from_messages(&failure_messages));

    TestCaseRecord {
        suite: suite_name.to_owned(),
        name,
        status,
        duration_ms: num_field(case, "duration"),
        failure_messages,
        failure_category,
    }
}

impl Domain for TestRunDomain {
    type Extras = TestRunDetail;

    const NAME: &'static str = "test_run";
    const FIELDS: &'static [FieldSpec] = TEST_FIELDS;

    fn validate_current(raw: &Value) -> Result<(), AnalysisError> {
        match raw.get("testResults") {
            Some(Value::Array(_)) => Ok(()),
            Some(_) => Err(AnalysisError::invalid_input(
                "current",
                "testResults must be an array",
            )),
            None => Err(AnalysisError::invalid_input(
                "current",
                "missing testResults array",
            )),
        }
    }

    fn extract(raw: &Value) -> (MetricRecord, TestRunDetail) {
        let mut record = MetricRecord {
            timestamp: timestamp_field(raw, "startTime"),
            ..MetricRecord::default()
        };
        record.set("totalTests", num_field(raw, "numTotalTests"));
        record.set("passedTests", num_field(raw, "numPassedTests"));
        record.set("failedTests", num_field(raw, "numFailedTests"));
        record.set("pendingTests", num_field(raw, "numPendingTests"));
        record.set("totalSuites", num_field(raw, "numTotalTestSuites"));
        record.set("passedSuites", num_field(raw, "numPassedTestSuites"));
        record.set("failedSuites", num_field(raw, "numFailedTestSuites"));

        let mut duration = 0.0;
        let mut cases = Vec::new();
        if let Some(suites) = raw.get("testResults").and_then(Value::as_array) {
            for suite in suites {
                duration += suite_runtime(suite);
                let suite_name = string_field(suite, "name");
                if let Some(results) = suite.get("assertionResults").and_then(Value::as_array) {
                    for case in results {
                        cases.push(flatten_case(&suite_name, case));
                    }
                }
            }
        }
        record.set("duration", duration);

        (record, TestRunDetail { cases })
    }

    fn recommend(
        record: &MetricRecord,
        extras: &TestRunDetail,
        config: &AnalysisConfig,
    ) -> Vec<Recommendation> {
        let mut recommendations = Vec::new();

        let total = record.get("totalTests");
        let failed = record.get("failedTests");
        let fail_rate = if total > 0.0 { failed / total } else { 0.0 };
        if fail_rate > config.acceptable_fail_rate {
            let failing = extras
                .cases
                .iter()
                .filter(|case| case.status == TestStatus::Failed)
                .map(|case| case.name.clone())
                .collect::<Vec<_>>();
            recommendations.push(
                Recommendation::new(
                    Severity::High,
                    RecommendationKind::FailureRate,
                    format!(
                        "{:.1}% of tests failed, above the {:.1}% tolerance",
                        fail_rate * 100.0,
                        config.acceptable_fail_rate * 100.0
                    ),
                    "Triage and fix the failing tests before shipping further changes",
                )
                .with_evidence(failing),
            );
        }

        let very_slow = extras
            .cases
            .iter()
            .filter(|case| case.duration_ms > config.very_slow_test_ms)
            .map(|case| case.name.clone())
            .collect::<Vec<_>>();
        if !very_slow.is_empty() {
            recommendations.push(
                Recommendation::new(
                    Severity::High,
                    RecommendationKind::VerySlowTests,
                    format!(
                        "{} test(s) exceed {:.0} ms",
                        very_slow.len(),
                        config.very_slow_test_ms
                    ),
                    "Break the named tests up or move them out of the blocking suite",
                )
                .with_evidence(very_slow),
            );
        }

        let slow_count = extras
            .cases
            .iter()
            .filter(|case| case.duration_ms > config.slow_test_ms)
            .count();
        if slow_count > SLOW_TEST_LIMIT {
            recommendations.push(Recommendation::new(
                Severity::Medium,
                RecommendationKind::SlowTests,
                format!(
                    "{slow_count} tests exceed {:.0} ms",
                    config.slow_test_ms
                ),
                "Profile the slow tests and cut shared setup cost",
            ));
        }

        let timeouts = failed_by_category(extras, FailureCategory::Timeout);
        if !timeouts.is_empty() {
            recommendations.push(
                Recommendation::new(
                    Severity::High,
                    RecommendationKind::TimeoutFailures,
                    format!("{} test(s) failed by timing out", timeouts.len()),
                    "Raise the timeout only after ruling out a hang; look for unresolved awaits",
                )
                .with_evidence(timeouts),
            );
        }

        let connections = failed_by_category(extras, FailureCategory::Connection);
        if !connections.is_empty() {
            recommendations.push(
                Recommendation::new(
                    Severity::High,
                    RecommendationKind::ConnectionFailures,
                    format!("{} test(s) failed on connection errors", connections.len()),
                    "Check service dependencies and test-environment networking",
                )
                .with_evidence(connections),
            );
        }

        recommendations
    }
}

fn failed_by_category(extras: &TestRunDetail, category: FailureCategory) -> Vec<String> {
    extras
        .cases
        .iter()
        .filter(|case| case.failure_category == Some(category))
        .map(|case| case.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use pulse_config::AnalysisConfig;
    use serde_json::json;

    use super::*;

    fn run_record() -> Value {
        json!({
            "numTotalTests": 10,
            "numPassedTests": 8,
            "numFailedTests": 2,
            "numPendingTests": 0,
            "numTotalTestSuites": 2,
            "numPassedTestSuites": 1,
            "numFailedTestSuites": 1,
            "startTime": 1_700_000_000_000_i64,
            "success": false,
            "testResults": [
                {
                    "name": "api.test.js",
                    "perfStats": { "runtime": 3_200 },
                    "assertionResults": [
                        {
                            "fullName": "api fetches the user",
                            "status": "passed",
                            "duration": 120,
                            "failureMessages": [],
                        },
                        {
                            "fullName": "api survives a slow upstream",
                            "status": "failed",
                            "duration": 5_500,
                            "failureMessages": ["Error: test timed out after 5000ms"],
                        },
                    ],
                },
                {
                    "name": "db.test.js",
                    "perfStats": { "start": 1_000, "end": 2_500 },
                    "assertionResults": [
                        {
                            "title": "db reconnects",
                            "status": "failed",
                            "duration": 90,
                            "failureMessages": ["connect ECONNREFUSED 127.0.0.1:5432"],
                        },
                    ],
                },
            ],
        })
    }

    #[test]
    fn validation_requires_a_test_results_array() {
        let analyzer = TestRunAnalyzer::new(AnalysisConfig::default());

        let missing = analyzer.analyze(&json!({ "numTotalTests": 3 }), &[]);
        assert!(
            missing
                .expect_err("missing testResults must be rejected")
                .to_string()
                .contains("testResults")
        );

        let wrong_type = analyzer.analyze(&json!({ "testResults": 7 }), &[]);
        assert!(
            wrong_type
                .expect_err("non-array testResults must be rejected")
                .to_string()
                .contains("array")
        );
    }

    #[test]
    fn extraction_flattens_suites_and_sums_runtimes() {
        let (record, detail) = TestRunDomain::extract(&run_record());

        assert_eq!(record.get("totalTests"), 10.0);
        assert_eq!(record.get("failedTests"), 2.0);
        // 3200 runtime + (2500 - 1000) fallback
        assert_eq!(record.get("duration"), 4_700.0);
        assert_eq!(record.timestamp, 1_700_000_000_000);

        assert_eq!(detail.cases.len(), 3);
        assert_eq!(detail.cases[0].suite, "api.test.js");
        assert_eq!(detail.cases[2].name, "db reconnects");
        assert_eq!(detail.cases[1].failure_category, Some(FailureCategory::Timeout));
        assert_eq!(
            detail.cases[2].failure_category,
            Some(FailureCategory::Connection)
        );
        assert_eq!(detail.cases[0].failure_category, None);
    }

    #[test]
    fn failure_rate_and_category_rules_fire() {
        let analyzer = TestRunAnalyzer::new(AnalysisConfig::default());
        let result = analyzer.analyze(&run_record(), &[]).expect("analyze");

        let kinds = result
            .recommendations
            .iter()
            .map(|recommendation| recommendation.kind)
            .collect::<Vec<_>>();
        // 20% failure rate, one very slow test, one timeout, one connection
        assert_eq!(
            kinds,
            vec![
                RecommendationKind::FailureRate,
                RecommendationKind::VerySlowTests,
                RecommendationKind::TimeoutFailures,
                RecommendationKind::ConnectionFailures,
            ]
        );

        let very_slow = &result.recommendations[1];
        assert_eq!(
            very_slow.evidence,
            vec!["api survives a slow upstream".to_owned()]
        );
    }

    #[test]
    fn many_slow_tests_draw_a_medium_finding() {
        let cases = (0..7)
            .map(|index| {
                json!({
                    "fullName": format!("slow case {index}"),
                    "status": "passed",
                    "duration": 1_500,
                    "failureMessages": [],
                })
            })
            .collect::<Vec<_>>();
        let raw = json!({
            "numTotalTests": 7,
            "numPassedTests": 7,
            "testResults": [
                { "name": "slow.test.js", "perfStats": { "runtime": 11_000 }, "assertionResults": cases },
            ],
        });

        let analyzer = TestRunAnalyzer::new(AnalysisConfig::default());
        let result = analyzer.analyze(&raw, &[]).expect("analyze");

        assert!(
            result
                .recommendations
                .iter()
                .any(|recommendation| recommendation.kind == RecommendationKind::SlowTests
                    && recommendation.severity == Severity::Medium)
        );
        // none of them crosses the very-slow bar
        assert!(
            !result
                .recommendations
                .iter()
                .any(|recommendation| recommendation.kind == RecommendationKind::VerySlowTests)
        );
    }

    #[test]
    fn zero_total_tests_is_a_zero_fail_rate() {
        let raw = json!({ "testResults": [] });
        let analyzer = TestRunAnalyzer::new(AnalysisConfig::default());
        let result = analyzer.analyze(&raw, &[]).expect("analyze");
        assert!(
            !result
                .recommendations
                .iter()
                .any(|recommendation| recommendation.kind == RecommendationKind::FailureRate)
        );
    }
}
