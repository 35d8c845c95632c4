//! Materialize a run and verify its lockfile against live sources.

use chrono::Utc;
use flowcert_materialize::{materialize, InMemoryDataSource};
use flowcert_types::{RuleFreshness, RuleSourceSnapshot, RuleVersion, Step, WorkflowDefVersion, WorkflowGraph};
use flowcert_verify::{verify, InMemoryRecordFetcher};
use serde_json::json;
use std::collections::BTreeMap;

fn make_source(fingerprint: &str) -> InMemoryDataSource {
    let graph = WorkflowGraph::new("wf1", "1.0.0")
        .with_step(Step::new("s1").with_rule("rule.deadline"));
    let mut rule_bindings = BTreeMap::new();
    rule_bindings.insert("rule.deadline".to_string(), "2.0.0".to_string());

    let mut source = InMemoryDataSource::new();
    source.add_definition(WorkflowDefVersion {
        id: "wf1".into(),
        version: "1.0.0".into(),
        checksum: "wc1".into(),
        graph,
        rule_bindings,
        template_bindings: BTreeMap::new(),
    });
    source.add_rule(RuleVersion {
        id: "rule.deadline".into(),
        version: "2.0.0".into(),
        checksum: "rc1".into(),
        sources: vec![RuleSourceSnapshot::new("src", "snap1", fingerprint)],
    });
    source
}

#[tokio::test]
async fn unchanged_records_verify_after_materialization() {
    let records = vec![json!({"deadline": "2026-12-31", "jurisdiction": "DE"})];
    let fingerprint = flowcert_hash::fingerprint_records(&records);

    let source = make_source(&fingerprint);
    let materialized = materialize("wf1", "1.0.0", &[], &source).await.unwrap();
    let rule = materialized.lockfile.rule("rule.deadline").unwrap();
    assert_eq!(rule.version, "2.0.0");
    assert_eq!(rule.checksum, "rc1");

    // The sources behind the rule have not moved: fully verified.
    let fetcher = InMemoryRecordFetcher::new().with_source("src", records);
    let result = verify(&materialized.lockfile, &fetcher, Utc::now())
        .await
        .unwrap();
    assert!(result.is_fully_verified());
    assert_eq!(
        result.rules["rule.deadline"].status,
        RuleFreshness::Verified
    );
}

#[tokio::test]
async fn changed_records_read_as_stale_after_materialization() {
    let original = vec![json!({"deadline": "2026-12-31"})];
    let fingerprint = flowcert_hash::fingerprint_records(&original);

    let source = make_source(&fingerprint);
    let materialized = materialize("wf1", "1.0.0", &[], &source).await.unwrap();

    let fetcher = InMemoryRecordFetcher::new()
        .with_source("src", vec![json!({"deadline": "2027-06-30"})]);
    let result = verify(&materialized.lockfile, &fetcher, Utc::now())
        .await
        .unwrap();
    assert_eq!(result.stale_rules(), vec!["rule.deadline"]);
    assert!(!result.rules["rule.deadline"].sources[0].matches);
}
