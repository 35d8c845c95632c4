//! Rule freshness verification
//!
//! A lockfile records, for every locked rule, the fingerprint of each
//! external source as observed when the rule version was published.
//! `verify` re-fetches each source's current records, recomputes the
//! fingerprint with the same canonicalization the snapshot side used,
//! and reports per-source evidence. A changed source makes the rule
//! stale; staleness is evidence for a human decision, never an error.
//! A source that cannot be fetched at all is an error: absence of
//! evidence must not read as staleness.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowcert_types::{RuleVerification, SourceEvidence, VerificationResult, WorkflowLockfile};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// How many current records are retained per source as a review sample.
pub const SAMPLE_LIMIT: usize = 5;

/// Failure to obtain current records for a source.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("could not fetch current records for source '{source_key}': {message}")]
    SourceFetch { source_key: String, message: String },
}

/// Fetches the current record set for an external source. Implementors
/// must return records in the source's stable publication order, since
/// record order participates in the fingerprint.
#[async_trait]
pub trait RecordFetcher: Send + Sync {
    async fn fetch_records(&self, source_key: &str) -> Result<Vec<Value>, String>;
}

/// In-memory fetcher keyed by source key. Sources not registered fail
/// to fetch, which mirrors an unreachable upstream.
#[derive(Clone, Debug, Default)]
pub struct InMemoryRecordFetcher {
    sources: HashMap<String, Vec<Value>>,
}

impl InMemoryRecordFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source_key: impl Into<String>, records: Vec<Value>) -> Self {
        self.sources.insert(source_key.into(), records);
        self
    }
}

#[async_trait]
impl RecordFetcher for InMemoryRecordFetcher {
    async fn fetch_records(&self, source_key: &str) -> Result<Vec<Value>, String> {
        self.sources
            .get(source_key)
            .cloned()
            .ok_or_else(|| format!("unknown source '{source_key}'"))
    }
}

/// Verify every rule in a lockfile against the current content of its
/// recorded sources. `now` is injected so results are reproducible in
/// tests and attributable in audit trails.
pub async fn verify(
    lockfile: &WorkflowLockfile,
    fetcher: &dyn RecordFetcher,
    now: DateTime<Utc>,
) -> Result<VerificationResult, VerifyError> {
    let mut rules = BTreeMap::new();

    for (rule_id, locked) in &lockfile.rules {
        let mut evidence = Vec::with_capacity(locked.sources.len());
        for snapshot in &locked.sources {
            let records = fetcher
                .fetch_records(&snapshot.source_key)
                .await
                .map_err(|message| VerifyError::SourceFetch {
                    source_key: snapshot.source_key.clone(),
                    message,
                })?;

            let observed = flowcert_hash::fingerprint_records(&records);
            let matches = observed == snapshot.fingerprint;
            if !matches {
                tracing::warn!(
                    rule = %rule_id,
                    source = %snapshot.source_key,
                    "source content changed since lock time"
                );
            }

            evidence.push(SourceEvidence {
                source_key: snapshot.source_key.clone(),
                snapshot_id: snapshot.snapshot_id.clone(),
                expected_fingerprint: snapshot.fingerprint.clone(),
                observed_fingerprint: observed,
                matches,
                record_count: records.len(),
                sample: records.into_iter().take(SAMPLE_LIMIT).collect(),
                fetched_at: now,
            });
        }
        rules.insert(rule_id.clone(), RuleVerification::from_sources(evidence));
    }

    let result = VerificationResult {
        verified_at: now,
        rules,
    };
    tracing::info!(
        rules = result.rules.len(),
        stale = result.stale_rules().len(),
        "lockfile verification complete"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowcert_types::{LockedRef, LockedRule, RuleFreshness, RuleSourceSnapshot};
    use serde_json::json;

    fn make_lockfile(rules: Vec<LockedRule>) -> WorkflowLockfile {
        WorkflowLockfile {
            workflow_def: LockedRef::new("wf1", "1.0.0", "wc1"),
            overlays: vec![],
            rules: rules.into_iter().map(|r| (r.id.clone(), r)).collect(),
            templates: BTreeMap::new(),
        }
    }

    fn locked_rule(id: &str, sources: Vec<RuleSourceSnapshot>) -> LockedRule {
        LockedRule {
            id: id.into(),
            version: "2.0.0".into(),
            checksum: "rc1".into(),
            sources,
        }
    }

    #[tokio::test]
    async fn test_unchanged_source_verifies() {
        let records = vec![json!({"id": 1, "rate": 19})];
        let fingerprint = flowcert_hash::fingerprint_records(&records);
        let lockfile = make_lockfile(vec![locked_rule(
            "rule.vat",
            vec![RuleSourceSnapshot::new("src.vat", "snap1", fingerprint)],
        )]);
        let fetcher = InMemoryRecordFetcher::new().with_source("src.vat", records);

        let result = verify(&lockfile, &fetcher, Utc::now()).await.unwrap();
        assert!(result.is_fully_verified());
        let rule = &result.rules["rule.vat"];
        assert_eq!(rule.status, RuleFreshness::Verified);
        assert!(rule.sources[0].matches);
        assert_eq!(rule.sources[0].record_count, 1);
    }

    #[tokio::test]
    async fn test_one_changed_source_makes_rule_stale() {
        let unchanged = vec![json!({"id": "a"})];
        let original = vec![json!({"id": "b", "rate": 19})];
        let current = vec![json!({"id": "b", "rate": 21})];

        let lockfile = make_lockfile(vec![locked_rule(
            "rule.vat",
            vec![
                RuleSourceSnapshot::new(
                    "src.stable",
                    "snap1",
                    flowcert_hash::fingerprint_records(&unchanged),
                ),
                RuleSourceSnapshot::new(
                    "src.rates",
                    "snap2",
                    flowcert_hash::fingerprint_records(&original),
                ),
            ],
        )]);
        let fetcher = InMemoryRecordFetcher::new()
            .with_source("src.stable", unchanged)
            .with_source("src.rates", current);

        let result = verify(&lockfile, &fetcher, Utc::now()).await.unwrap();
        assert_eq!(result.stale_rules(), vec!["rule.vat"]);

        let rule = &result.rules["rule.vat"];
        assert_eq!(rule.status, RuleFreshness::Stale);
        assert!(rule.sources[0].matches);
        assert!(!rule.sources[1].matches);
        assert_ne!(
            rule.sources[1].observed_fingerprint,
            rule.sources[1].expected_fingerprint
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_is_an_error_not_staleness() {
        let lockfile = make_lockfile(vec![locked_rule(
            "rule.vat",
            vec![RuleSourceSnapshot::new("src.gone", "snap1", "fp1")],
        )]);
        let fetcher = InMemoryRecordFetcher::new();

        let err = verify(&lockfile, &fetcher, Utc::now()).await.unwrap_err();
        match err {
            VerifyError::SourceFetch { source_key, .. } => assert_eq!(source_key, "src.gone"),
        }
    }

    #[tokio::test]
    async fn test_sample_is_bounded() {
        let records: Vec<Value> = (0..20).map(|i| json!({"id": i})).collect();
        let fingerprint = flowcert_hash::fingerprint_records(&records);
        let lockfile = make_lockfile(vec![locked_rule(
            "rule.big",
            vec![RuleSourceSnapshot::new("src.big", "snap1", fingerprint)],
        )]);
        let fetcher = InMemoryRecordFetcher::new().with_source("src.big", records);

        let result = verify(&lockfile, &fetcher, Utc::now()).await.unwrap();
        let source = &result.rules["rule.big"].sources[0];
        assert_eq!(source.record_count, 20);
        assert_eq!(source.sample.len(), SAMPLE_LIMIT);
    }

    #[tokio::test]
    async fn test_verified_at_is_the_injected_instant() {
        let now = Utc::now();
        let lockfile = make_lockfile(vec![]);
        let fetcher = InMemoryRecordFetcher::new();

        let result = verify(&lockfile, &fetcher, now).await.unwrap();
        assert_eq!(result.verified_at, now);
        assert!(result.is_fully_verified());
    }

    #[tokio::test]
    async fn test_record_order_participates_in_fingerprint() {
        let original = vec![json!({"id": 1}), json!({"id": 2})];
        let reordered = vec![json!({"id": 2}), json!({"id": 1})];
        let lockfile = make_lockfile(vec![locked_rule(
            "rule.ord",
            vec![RuleSourceSnapshot::new(
                "src.ord",
                "snap1",
                flowcert_hash::fingerprint_records(&original),
            )],
        )]);
        let fetcher = InMemoryRecordFetcher::new().with_source("src.ord", reordered);

        let result = verify(&lockfile, &fetcher, Utc::now()).await.unwrap();
        assert_eq!(result.rules["rule.ord"].status, RuleFreshness::Stale);
    }
}
