use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Severity attached to anomalies and recommendations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Coarse categorization of a test failure, inferred from its failure
/// messages. Timeout and connection failures get dedicated recommendation
/// rules; everything recognizably assertion-shaped is grouped separately so
/// it does not trip the infrastructure rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    Timeout,
    Connection,
    Assertion,
    Unknown,
}

const TIMEOUT_INDICATORS: &[&str] = &["timeout", "timed out", "exceeded", "deadline"];
const CONNECTION_INDICATORS: &[&str] = &[
    "econnrefused",
    "econnreset",
    "connection",
    "socket hang up",
    "network",
    "enotfound",
];
const ASSERTION_INDICATORS: &[&str] = &["expect", "assert", "received", "to equal", "to be"];

impl FailureCategory {
    /// Categorize a single failure message by indicator keywords.
    pub fn from_message(message: &str) -> Self {
        let lowered = message.to_lowercase();
        if TIMEOUT_INDICATORS.iter().any(|hint| lowered.contains(hint)) {
            Self::Timeout
        } else if CONNECTION_INDICATORS.iter().any(|hint| lowered.contains(hint)) {
            Self::Connection
        } else if ASSERTION_INDICATORS.iter().any(|hint| lowered.contains(hint)) {
            Self::Assertion
        } else {
            Self::Unknown
        }
    }

    /// Categorize a failed test from all of its messages. The first message
    /// matching a specific category wins; an empty list is `Unknown`.
    pub fn from_messages<S: AsRef<str>>(messages: &[S]) -> Self {
        let mut fallback = Self::Unknown;
        for message in messages {
            match Self::from_message(message.as_ref()) {
                Self::Unknown => {}
                Self::Assertion => {
                    if fallback == Self::Unknown {
                        fallback = Self::Assertion;
                    }
                }
                specific => return specific,
            }
        }
        fallback
    }
}

/// Current time as epoch milliseconds. Zero if the clock is before the epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or(0)
}
