//! Input handed to a durable step workflow execution

use crate::ids::{OrgId, RunId, StepKey, TenantId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything a step workflow needs to run: who it acts for, which run
/// and step it belongs to, and an arbitrary typed payload. The
/// orchestrator derives the deterministic workflow identifier and the
/// tenant-scoped task queue from these fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepWorkflowInput {
    pub tenant_id: TenantId,
    pub org_id: OrgId,
    pub run_id: RunId,
    pub step_key: StepKey,
    #[serde(default)]
    pub payload: Value,
    /// Counterparty organization, when the step involves one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_org: Option<OrgId>,
}

impl StepWorkflowInput {
    pub fn new(tenant_id: TenantId, org_id: OrgId, run_id: RunId, step_key: StepKey) -> Self {
        Self {
            tenant_id,
            org_id,
            run_id,
            step_key,
            payload: Value::Null,
            partner_org: None,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_partner_org(mut self, org: OrgId) -> Self {
        self.partner_org = Some(org);
        self
    }
}
