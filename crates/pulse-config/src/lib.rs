use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PULSE_DIR_NAME: &str = ".pulse";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Workspace configuration file root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PulseConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Tunable thresholds for the analytics pipeline. Constructed once and
/// treated as read-only for the analyzer's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Max historical records aggregated into the baseline.
    #[serde(default = "default_baseline_window")]
    pub baseline_window: usize,
    /// current/baseline ratio at or above this is a regression.
    #[serde(default = "default_regression_threshold")]
    pub regression_threshold: f64,
    /// current/baseline ratio at or below this is an improvement.
    #[serde(default = "default_improvement_threshold")]
    pub improvement_threshold: f64,
    /// Test analyzer: tolerated failed/total ratio.
    #[serde(default = "default_acceptable_fail_rate")]
    pub acceptable_fail_rate: f64,
    /// Test analyzer: a test slower than this is "slow".
    #[serde(default = "default_slow_test_ms")]
    pub slow_test_ms: f64,
    /// Test analyzer: a test slower than this is "very slow".
    #[serde(default = "default_very_slow_test_ms")]
    pub very_slow_test_ms: f64,
    /// Coverage analyzer: minimum acceptable line coverage percent.
    #[serde(default = "default_line_threshold")]
    pub line_threshold: f64,
    /// Coverage analyzer: minimum acceptable branch coverage percent.
    #[serde(default = "default_branch_threshold")]
    pub branch_threshold: f64,
    /// Coverage analyzer: minimum acceptable function coverage percent.
    #[serde(default = "default_function_threshold")]
    pub function_threshold: f64,
    /// Coverage analyzer: minimum acceptable statement coverage percent.
    #[serde(default = "default_statement_threshold")]
    pub statement_threshold: f64,
    #[serde(default)]
    pub anomaly: AnomalyThresholds,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            baseline_window: default_baseline_window(),
            regression_threshold: default_regression_threshold(),
            improvement_threshold: default_improvement_threshold(),
            acceptable_fail_rate: default_acceptable_fail_rate(),
            slow_test_ms: default_slow_test_ms(),
            very_slow_test_ms: default_very_slow_test_ms(),
            line_threshold: default_line_threshold(),
            branch_threshold: default_branch_threshold(),
            function_threshold: default_function_threshold(),
            statement_threshold: default_statement_threshold(),
            anomaly: AnomalyThresholds::default(),
        }
    }
}

/// Heuristic anomaly-rule thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyThresholds {
    /// Duration spike: current above p95 times this ratio.
    #[serde(default = "default_duration_spike_ratio")]
    pub duration_spike_ratio: f64,
    /// Test-count delta: current off the mean by more than this fraction.
    #[serde(default = "default_test_count_delta")]
    pub test_count_delta: f64,
    /// Coverage drop: current below the mean by more than this many points.
    #[serde(default = "default_coverage_drop_points")]
    pub coverage_drop_points: f64,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            duration_spike_ratio: default_duration_spike_ratio(),
            test_count_delta: default_test_count_delta(),
            coverage_drop_points: default_coverage_drop_points(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("failed to serialize config TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub fn pulse_dir(workspace_root: impl AsRef<Path>) -> PathBuf {
    workspace_root.as_ref().join(PULSE_DIR_NAME)
}

pub fn config_path(workspace_root: impl AsRef<Path>) -> PathBuf {
    pulse_dir(workspace_root).join(CONFIG_FILE_NAME)
}

/// Load `.pulse/config.toml` from the workspace, falling back to defaults
/// when the file does not exist.
pub fn load_workspace_config(workspace_root: impl AsRef<Path>) -> Result<PulseConfig, ConfigError> {
    let path = config_path(workspace_root);
    if !path.exists() {
        return Ok(PulseConfig::default());
    }

    let raw = fs::read_to_string(path)?;
    let parsed: PulseConfig = toml::from_str(&raw)?;
    Ok(normalize_config(parsed))
}

/// Load the workspace config, writing a default file first if none exists.
pub fn ensure_workspace_config(
    workspace_root: impl AsRef<Path>,
) -> Result<PulseConfig, ConfigError> {
    let workspace_root = workspace_root.as_ref();
    fs::create_dir_all(pulse_dir(workspace_root))?;

    let path = config_path(workspace_root);
    if path.exists() {
        return load_workspace_config(workspace_root);
    }

    let config = PulseConfig::default();
    let content = toml::to_string_pretty(&config)?;
    fs::write(path, content)?;

    Ok(config)
}

fn default_baseline_window() -> usize {
    10
}

fn default_regression_threshold() -> f64 {
    1.5
}

fn default_improvement_threshold() -> f64 {
    0.8
}

fn default_acceptable_fail_rate() -> f64 {
    0.05
}

fn default_slow_test_ms() -> f64 {
    1_000.0
}

fn default_very_slow_test_ms() -> f64 {
    5_000.0
}

fn default_line_threshold() -> f64 {
    80.0
}

fn default_branch_threshold() -> f64 {
    70.0
}

fn default_function_threshold() -> f64 {
    80.0
}

fn default_statement_threshold() -> f64 {
    80.0
}

fn default_duration_spike_ratio() -> f64 {
    1.2
}

fn default_test_count_delta() -> f64 {
    0.1
}

fn default_coverage_drop_points() -> f64 {
    5.0
}

fn normalize_config(mut config: PulseConfig) -> PulseConfig {
    let analysis = &mut config.analysis;
    if analysis.baseline_window == 0 {
        analysis.baseline_window = default_baseline_window();
    }
    if !analysis.regression_threshold.is_finite() || analysis.regression_threshold <= 0.0 {
        analysis.regression_threshold = default_regression_threshold();
    }
    if !analysis.improvement_threshold.is_finite() || analysis.improvement_threshold <= 0.0 {
        analysis.improvement_threshold = default_improvement_threshold();
    }
    if !analysis.acceptable_fail_rate.is_finite() {
        analysis.acceptable_fail_rate = default_acceptable_fail_rate();
    }
    analysis.acceptable_fail_rate = analysis.acceptable_fail_rate.clamp(0.0, 1.0);
    config
}
