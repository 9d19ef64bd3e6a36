mod anomaly;
mod baseline;
mod build;
mod compare;
mod coverage;
mod metric;
mod pipeline;
mod recommend;
mod report;
mod test_run;
mod trend;

pub use anomaly::{Anomaly, AnomalyKind, detect_anomalies};
pub use baseline::{Baseline, compute_baseline};
pub use build::{BuildAnalyzer, BuildDetail, BuildDomain};
pub use compare::{Comparison, FieldComparison, Status, compare};
pub use coverage::{CoverageAnalyzer, CoverageDetail, CoverageDomain, FileCoverage};
pub use metric::{FieldKind, FieldRole, FieldSpec, MetricRecord, field_with_role};
pub use pipeline::{
    ANALYSIS_SCHEMA_VERSION, AnalysisError, AnalysisResult, Analyzer, Domain,
};
pub use recommend::{Recommendation, RecommendationKind};
pub use report::render_report;
pub use test_run::{
    TestCaseRecord, TestRunAnalyzer, TestRunDetail, TestRunDomain, TestStatus,
};
pub use trend::{
    CoverageDirection, CoverageTrend, DurationDirection, DurationTrend, TREND_MIN_HISTORY, Trend,
    analyze_trend,
};
