//! Immutable version records and overlay patches
//!
//! Version records are produced by an upstream authoring/publishing
//! process and retrieved through the data source seam. Their checksums
//! are opaque content-addressed identities supplied by that source; the
//! engine records them verbatim and never recomputes them during
//! materialization.

use crate::graph::WorkflowGraph;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// ── Overlay Patches ──────────────────────────────────────────────────

/// A single structural edit against a JSON-Pointer path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    /// Insert a value. At an array tail path (`-` or one-past-end
    /// index) this appends.
    Add { path: String, value: Value },
    /// Overwrite an existing value. The path must already exist.
    Replace { path: String, value: Value },
    /// Delete an existing value. The path must already exist.
    Remove { path: String },
}

impl PatchOp {
    pub fn path(&self) -> &str {
        match self {
            Self::Add { path, .. } | Self::Replace { path, .. } | Self::Remove { path } => path,
        }
    }
}

/// An ordered sequence of structural edits with provenance.
///
/// Patches are applied in registration order; later patches see the
/// effects of earlier ones.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayPatch {
    /// The source pack this patch came from (provenance tag)
    pub source_pack: String,
    pub ops: Vec<PatchOp>,
}

impl OverlayPatch {
    pub fn new(source_pack: impl Into<String>) -> Self {
        Self {
            source_pack: source_pack.into(),
            ops: Vec::new(),
        }
    }

    pub fn with_op(mut self, op: PatchOp) -> Self {
        self.ops.push(op);
        self
    }
}

// ── Version Records ──────────────────────────────────────────────────

/// A versioned workflow definition: the base graph plus the binding
/// selectors that pin which rule/template versions the graph expects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefVersion {
    pub id: String,
    pub version: String,
    /// Opaque content checksum supplied by the data source
    pub checksum: String,
    pub graph: WorkflowGraph,
    /// rule id → version selector understood by the data source
    #[serde(default)]
    pub rule_bindings: BTreeMap<String, String>,
    /// template id → version selector understood by the data source
    #[serde(default)]
    pub template_bindings: BTreeMap<String, String>,
}

/// A versioned overlay: one patch with provenance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverlayVersion {
    pub id: String,
    pub version: String,
    pub checksum: String,
    pub patch: OverlayPatch,
}

/// A versioned rule, with the source snapshots observed when the rule
/// version was published.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleVersion {
    pub id: String,
    pub version: String,
    pub checksum: String,
    #[serde(default)]
    pub sources: Vec<RuleSourceSnapshot>,
}

/// A versioned document template. The storage reference is opaque to
/// the engine; rendering is an external collaborator's concern.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateVersion {
    pub id: String,
    pub version: String,
    pub checksum: String,
    pub storage_ref: String,
}

/// The external data source observation a rule version was built from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSourceSnapshot {
    /// Key identifying the external source (e.g. a dataset slug)
    pub source_key: String,
    /// Identifier of the snapshot taken at publish time
    pub snapshot_id: String,
    /// Hash of the canonicalized record set as observed at snapshot time
    pub fingerprint: String,
}

impl RuleSourceSnapshot {
    pub fn new(
        source_key: impl Into<String>,
        snapshot_id: impl Into<String>,
        fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            source_key: source_key.into(),
            snapshot_id: snapshot_id.into(),
            fingerprint: fingerprint.into(),
        }
    }
}

/// A caller-supplied reference to an overlay version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayRef {
    pub id: String,
    pub version: String,
}

impl OverlayRef {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_patch_op_serde() {
        let op: PatchOp = serde_json::from_value(json!({
            "op": "add",
            "path": "/steps/-",
            "value": {"id": "extra"}
        }))
        .unwrap();
        assert_eq!(op.path(), "/steps/-");

        let remove: PatchOp =
            serde_json::from_value(json!({"op": "remove", "path": "/steps/0"})).unwrap();
        assert_eq!(remove, PatchOp::Remove { path: "/steps/0".into() });
    }

    #[test]
    fn test_overlay_patch_builder_keeps_order() {
        let patch = OverlayPatch::new("pack.notary")
            .with_op(PatchOp::Remove { path: "/a".into() })
            .with_op(PatchOp::Add { path: "/b".into(), value: json!(1) });
        assert_eq!(patch.ops.len(), 2);
        assert_eq!(patch.ops[0].path(), "/a");
        assert_eq!(patch.source_pack, "pack.notary");
    }

    #[test]
    fn test_rule_version_serde() {
        let rule = RuleVersion {
            id: "rule.deadline".into(),
            version: "2.0.0".into(),
            checksum: "rc1".into(),
            sources: vec![RuleSourceSnapshot::new("src", "snap1", "fp1")],
        };
        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(value["sources"][0]["sourceKey"], "src");
        assert_eq!(value["sources"][0]["snapshotId"], "snap1");
    }
}
