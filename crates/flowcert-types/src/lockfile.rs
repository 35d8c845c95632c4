//! The workflow lockfile: the frozen, checksummed record of a run
//!
//! A lockfile is created once per run at materialization time and is
//! thereafter immutable. It is the sole externally persisted proof of
//! "what was actually run": which workflow definition, overlays, rule
//! versions, and template versions were combined. Serialization is
//! byte-deterministic: struct field order is fixed and the rule and
//! template maps are ordered, so materializing twice against an
//! unchanged data source yields identical JSON.

use crate::version::RuleSourceSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A locked (id, version, checksum) triple.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedRef {
    pub id: String,
    pub version: String,
    pub checksum: String,
}

impl LockedRef {
    pub fn new(
        id: impl Into<String>,
        version: impl Into<String>,
        checksum: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            checksum: checksum.into(),
        }
    }
}

/// A locked rule version together with the source snapshots recorded
/// when the rule version was published. The snapshots are what the
/// freshness verifier later checks against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedRule {
    pub id: String,
    pub version: String,
    pub checksum: String,
    pub sources: Vec<RuleSourceSnapshot>,
}

/// Immutable, checksummed record of exactly which versions were
/// combined to produce a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowLockfile {
    /// The workflow definition the run was built from
    pub workflow_def: LockedRef,
    /// Overlays in application order
    pub overlays: Vec<LockedRef>,
    /// rule id → locked rule version
    pub rules: BTreeMap<String, LockedRule>,
    /// template id → locked template version
    pub templates: BTreeMap<String, LockedRef>,
}

impl WorkflowLockfile {
    /// Look up a locked rule.
    pub fn rule(&self, rule_id: &str) -> Option<&LockedRule> {
        self.rules.get(rule_id)
    }

    /// Look up a locked template.
    pub fn template(&self, template_id: &str) -> Option<&LockedRef> {
        self.templates.get(template_id)
    }

    /// Serialize to the canonical JSON document handed to run storage.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
