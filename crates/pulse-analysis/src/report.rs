use std::fmt::Write;

use crate::compare::Status;
use crate::pipeline::AnalysisResult;

/// Render an analysis result as a plain-text report. Pure string output;
/// empty sections are omitted.
pub fn render_report<X>(result: &AnalysisResult<X>) -> String {
    let mut report = String::new();

    let title = format!("{} analysis report", result.domain);
    let _ = writeln!(report, "{}", title.to_uppercase());
    let _ = writeln!(report, "{}", "=".repeat(title.len()));
    report.push('\n');

    match &result.baseline {
        Some(baseline) => {
            let _ = writeln!(report, "Baseline: {} sample(s)", baseline.sample_size);
        }
        None => {
            let _ = writeln!(report, "Baseline: none (insufficient history)");
        }
    }

    if result.comparison.has_baseline {
        report.push('\n');
        let _ = writeln!(report, "Comparison:");
        for (name, field) in &result.comparison.fields {
            let status = match field.status {
                Status::Regression => "regression",
                Status::Improvement => "improvement",
                Status::Stable => "stable",
            };
            let _ = writeln!(
                report,
                "  {name}: {:.1} vs {:.1} ({status})",
                field.current, field.baseline
            );
        }
    }

    if let Some(trend) = &result.trend {
        report.push('\n');
        let _ = writeln!(report, "Trend:");
        if let Some(duration) = &trend.duration {
            let _ = writeln!(report, "  {}", duration.message);
        }
        if let Some(coverage) = &trend.coverage {
            let _ = writeln!(report, "  {}", coverage.message);
        }
    }

    if !result.anomalies.is_empty() {
        report.push('\n');
        let _ = writeln!(report, "Anomalies:");
        for anomaly in &result.anomalies {
            let _ = writeln!(
                report,
                "  [{}] {}",
                anomaly.severity.as_str(),
                anomaly.message
            );
        }
    }

    if !result.recommendations.is_empty() {
        report.push('\n');
        let _ = writeln!(report, "Recommendations:");
        for recommendation in &result.recommendations {
            let _ = writeln!(
                report,
                "  [{}] {}",
                recommendation.severity.as_str(),
                recommendation.message
            );
            let _ = writeln!(report, "      action: {}", recommendation.action);
            for item in &recommendation.evidence {
                let _ = writeln!(report, "      - {item}");
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use pulse_config::AnalysisConfig;
    use serde_json::json;

    use crate::build::BuildAnalyzer;

    use super::*;

    #[test]
    fn report_names_regressions_and_actions() {
        let analyzer = BuildAnalyzer::new(AnalysisConfig::default());
        let history = (0..10)
            .map(|index| {
                json!({ "totalDuration": 5_000, "coverage": 80, "timestamp": index })
            })
            .collect::<Vec<_>>();
        let current = json!({ "totalDuration": 9_000, "coverage": 70, "timestamp": 11 });

        let result = analyzer.analyze(&current, &history).expect("analyze");
        let report = render_report(&result);

        assert!(report.starts_with("BUILD ANALYSIS REPORT"));
        assert!(report.contains("Baseline: 10 sample(s)"));
        assert!(report.contains("totalDuration: 9000.0 vs 5000.0 (regression)"));
        assert!(report.contains("Recommendations:"));
        assert!(report.contains("action:"));
    }

    #[test]
    fn report_without_history_says_so_and_omits_empty_sections() {
        let analyzer = BuildAnalyzer::new(AnalysisConfig::default());
        let result = analyzer
            .analyze(&json!({ "totalDuration": 5_000, "timestamp": 1 }), &[])
            .expect("analyze");

        let report = render_report(&result);
        assert!(report.contains("Baseline: none (insufficient history)"));
        assert!(!report.contains("Comparison:"));
        assert!(!report.contains("Anomalies:"));
        assert!(!report.contains("Recommendations:"));
    }
}
