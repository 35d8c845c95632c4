//! Deterministic identifiers, task queues, and search attributes
//!
//! Workflow identifiers are derived from the business coordinates, so
//! starting the same step twice produces the same identifier and the
//! substrate can reject the duplicate. Task queues are tenant-scoped to
//! keep one tenant's load and failures off another's workers.

use crate::kind::WorkflowKind;
use flowcert_types::{OrgId, RunId, StepKey, TenantId};
use serde::{Deserialize, Serialize};

/// `"{org}:{run}:{step}:{workflow-kind}"`
pub fn workflow_id(org: &OrgId, run: &RunId, step: &StepKey, kind: WorkflowKind) -> String {
    format!("{org}:{run}:{step}:{kind}")
}

/// `"tenant-{sanitized}-main"`. Sanitization lowercases and maps every
/// non-alphanumeric character to `-`.
pub fn task_queue(tenant: &TenantId) -> String {
    format!("tenant-{}-main", sanitize_tenant(tenant.as_str()))
}

fn sanitize_tenant(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

/// Keyword search attributes attached to every execution for
/// operational querying.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchAttributes {
    pub run_id: String,
    pub subject_org: String,
    pub step_key: String,
    pub environment: String,
}

impl SearchAttributes {
    pub fn new(run: &RunId, org: &OrgId, step: &StepKey, environment: impl Into<String>) -> Self {
        Self {
            run_id: run.to_string(),
            subject_org: org.to_string(),
            step_key: step.to_string(),
            environment: environment.into(),
        }
    }

    /// Attribute pairs in the substrate's keyword format.
    pub fn as_pairs(&self) -> [(&'static str, &str); 4] {
        [
            ("RunId", self.run_id.as_str()),
            ("SubjectOrg", self.subject_org.as_str()),
            ("StepKey", self.step_key.as_str()),
            ("Environment", self.environment.as_str()),
        ]
    }
}
