use std::collections::BTreeMap;

use pulse_core::now_millis;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Unit of a tracked metric field. Duration fields additionally get a p95
/// baseline; percent fields are classified by direct inequality instead of
/// ratio thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    DurationMs,
    Count,
    Percent,
}

/// Cross-domain role of a field. The trend and anomaly stages operate on
/// roles so they stay independent of per-domain field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    TotalDuration,
    TestCount,
    Coverage,
}

/// One entry of a domain's static field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub role: Option<FieldRole>,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            role: None,
        }
    }

    pub const fn with_role(mut self, role: FieldRole) -> Self {
        self.role = Some(role);
        self
    }
}

/// Find the field carrying a given role, if the domain tracks one.
pub fn field_with_role(fields: &[FieldSpec], role: FieldRole) -> Option<&FieldSpec> {
    fields.iter().find(|spec| spec.role == Some(role))
}

/// Canonical per-build metric record: an ordered map from metric name to
/// value plus a timestamp. Immutable once extracted; absent input fields are
/// zero, an absent timestamp is the extraction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MetricRecord {
    pub values: BTreeMap<String, f64>,
    pub timestamp: i64,
}

impl MetricRecord {
    pub fn get(&self, name: &str) -> f64 {
        self.values.get(name).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_owned(), value);
    }
}

/// Read a numeric field off a raw record, defaulting to 0. Absence of data
/// is not an error.
pub(crate) fn num_field(raw: &Value, key: &str) -> f64 {
    raw.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Read a millisecond timestamp off a raw record, defaulting to now.
pub(crate) fn timestamp_field(raw: &Value, key: &str) -> i64 {
    raw.get(key).and_then(Value::as_i64).unwrap_or_else(now_millis)
}
