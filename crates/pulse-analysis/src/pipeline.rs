use std::marker::PhantomData;
use std::path::Path;

use pulse_config::AnalysisConfig;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;

use crate::anomaly::{Anomaly, detect_anomalies};
use crate::baseline::{Baseline, compute_baseline};
use crate::compare::{Comparison, compare};
use crate::metric::{FieldSpec, MetricRecord};
use crate::recommend::{Recommendation, shared_recommendations};
use crate::trend::{Trend, analyze_trend};

pub const ANALYSIS_SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The validation boundary: raised before any computation when an input
    /// argument is malformed. Everything past this point recovers locally.
    #[error("invalid {argument}: {reason}")]
    InvalidInput {
        argument: &'static str,
        reason: String,
    },
    #[error("config error: {0}")]
    Config(#[from] pulse_config::ConfigError),
}

impl AnalysisError {
    pub(crate) fn invalid_input(argument: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            argument,
            reason: reason.into(),
        }
    }
}

/// Per-domain capability the generic pipeline is parameterized over: the
/// field table, raw-record extraction, input validation, and the
/// domain-specific recommendation rules. Baseline, comparison, trend and
/// anomaly logic are shared.
pub trait Domain {
    /// Domain detail carried alongside the canonical record (per-file
    /// coverage, flattened test cases).
    type Extras: std::fmt::Debug + Clone + PartialEq + Serialize + DeserializeOwned;

    const NAME: &'static str;
    const FIELDS: &'static [FieldSpec];

    /// Extra validation of the current record beyond the object check.
    fn validate_current(_raw: &Value) -> Result<(), AnalysisError> {
        Ok(())
    }

    /// Normalize one raw record. Never fails: absent fields extract to zero.
    fn extract(raw: &Value) -> (MetricRecord, Self::Extras);

    /// Domain-specific recommendation rules, appended after the shared ones.
    fn recommend(
        record: &MetricRecord,
        extras: &Self::Extras,
        config: &AnalysisConfig,
    ) -> Vec<Recommendation>;
}

/// Full output of one `analyze` call. Created fresh per invocation; nothing
/// persists between calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult<X> {
    pub schema_version: String,
    pub domain: String,
    pub current: MetricRecord,
    pub detail: X,
    pub baseline: Option<Baseline>,
    pub comparison: Comparison,
    pub trend: Option<Trend>,
    pub anomalies: Vec<Anomaly>,
    pub recommendations: Vec<Recommendation>,
}

/// The generic analyzer. The configuration is fixed at construction and
/// read-only afterwards; `analyze` is a pure function of its arguments, so
/// one analyzer can serve concurrent callers without locking.
#[derive(Debug, Clone)]
pub struct Analyzer<D: Domain> {
    config: AnalysisConfig,
    _domain: PhantomData<D>,
}

impl<D: Domain> Analyzer<D> {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            _domain: PhantomData,
        }
    }

    /// Construct with the analysis section of `.pulse/config.toml`, falling
    /// back to defaults when the workspace has no config file.
    pub fn from_workspace(workspace_root: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let config = pulse_config::load_workspace_config(workspace_root)?;
        Ok(Self::new(config.analysis))
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze the current raw record against the ordered
    /// (oldest-to-newest) history.
    pub fn analyze(
        &self,
        current: &Value,
        history: &[Value],
    ) -> Result<AnalysisResult<D::Extras>, AnalysisError> {
        if !current.is_object() {
            return Err(AnalysisError::invalid_input(
                "current",
                "expected a JSON object record",
            ));
        }
        D::validate_current(current)?;

        let (record, extras) = D::extract(current);

        let mut records = Vec::with_capacity(history.len());
        for raw in history {
            if !raw.is_object() {
                tracing::warn!(
                    domain = D::NAME,
                    "non-object history record extracts to zeros"
                );
            }
            records.push(D::extract(raw).0);
        }

        let baseline = compute_baseline(&records, D::FIELDS, self.config.baseline_window);
        tracing::debug!(
            domain = D::NAME,
            history = records.len(),
            samples = baseline.as_ref().map_or(0, |baseline| baseline.sample_size),
            "baseline computed"
        );

        let comparison = compare(&record, baseline.as_ref(), D::FIELDS, &self.config);
        let trend = analyze_trend(&records, D::FIELDS);
        let anomalies = detect_anomalies(
            &record,
            baseline.as_ref(),
            D::FIELDS,
            &self.config.anomaly,
        );

        let mut recommendations = shared_recommendations(&comparison, trend.as_ref(), D::FIELDS);
        recommendations.extend(D::recommend(&record, &extras, &self.config));

        tracing::debug!(
            domain = D::NAME,
            anomalies = anomalies.len(),
            recommendations = recommendations.len(),
            "analysis complete"
        );

        Ok(AnalysisResult {
            schema_version: ANALYSIS_SCHEMA_VERSION.to_owned(),
            domain: D::NAME.to_owned(),
            current: record,
            detail: extras,
            baseline,
            comparison,
            trend,
            anomalies,
            recommendations,
        })
    }
}
