//! Freshness verification evidence
//!
//! A verification run recomputes content fingerprints for the external
//! sources behind each locked rule and compares them to the values
//! recorded at lock time. The result is evidence, never an error:
//! staleness is a first-class outcome. Only the latest result matters;
//! results are not themselves versioned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Freshness status of a single rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleFreshness {
    /// Every recorded source still matches its fingerprint
    Verified,
    /// At least one source's content changed since lock time
    Stale,
}

/// Evidence for a single source snapshot comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceEvidence {
    pub source_key: String,
    pub snapshot_id: String,
    /// Fingerprint recorded at lock time
    pub expected_fingerprint: String,
    /// Fingerprint recomputed from the current records
    pub observed_fingerprint: String,
    pub matches: bool,
    /// How many records the source currently returns
    pub record_count: usize,
    /// Bounded sample of current records for human review
    pub sample: Vec<Value>,
    pub fetched_at: DateTime<Utc>,
}

/// Per-rule verification outcome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleVerification {
    pub status: RuleFreshness,
    pub sources: Vec<SourceEvidence>,
}

impl RuleVerification {
    /// Derive the rule status from its source evidence: stale iff any
    /// source fails to match.
    pub fn from_sources(sources: Vec<SourceEvidence>) -> Self {
        let status = if sources.iter().all(|s| s.matches) {
            RuleFreshness::Verified
        } else {
            RuleFreshness::Stale
        };
        Self { status, sources }
    }
}

/// The outcome of one verification pass over a lockfile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub verified_at: DateTime<Utc>,
    pub rules: BTreeMap<String, RuleVerification>,
}

impl VerificationResult {
    /// Rule ids whose sources changed since lock time.
    pub fn stale_rules(&self) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|(_, v)| v.status == RuleFreshness::Stale)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// True when every rule verified cleanly.
    pub fn is_fully_verified(&self) -> bool {
        self.rules
            .values()
            .all(|v| v.status == RuleFreshness::Verified)
    }
}
