//! Supported step workflow kinds

use crate::substrate::{OrchestratorError, OrchestratorResult};
use flowcert_steps::{ExternalJobConfig, PathMatcher, StepMachine};
use flowcert_types::StepWorkflowInput;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The step workflow kinds the orchestrator can start. The wire name
/// participates in the deterministic workflow identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowKind {
    NameCheck,
    TaxClearance,
    DocumentPack,
    TaxSubmission,
    ExternalJob,
}

impl std::fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NameCheck => "name-check",
            Self::TaxClearance => "tax-clearance",
            Self::DocumentPack => "document-pack",
            Self::TaxSubmission => "tax-submission",
            Self::ExternalJob => "external-job",
        };
        write!(f, "{s}")
    }
}

impl WorkflowKind {
    /// Build the state machine for this kind from the workflow input.
    ///
    /// External jobs read their response classifiers from the payload's
    /// `successWhen` / `failureWhen` arrays of `{path, expected}`
    /// entries; absent classifiers mean the job stays `waiting` until a
    /// deadline escalates it. Classifiers that are present but do not
    /// parse reject the input, since the job could never classify a
    /// poll response.
    pub fn build_machine(&self, input: &StepWorkflowInput) -> OrchestratorResult<StepMachine> {
        Ok(match self {
            Self::NameCheck => StepMachine::name_check(input.payload.clone()),
            Self::TaxClearance => StepMachine::tax_clearance(input.payload.clone()),
            Self::DocumentPack => StepMachine::document_pack(input.payload.clone()),
            Self::TaxSubmission => StepMachine::tax_submission(input.payload.clone()),
            Self::ExternalJob => StepMachine::external_job(ExternalJobConfig {
                start_payload: input.payload.clone(),
                success: matchers_from(&input.payload, "successWhen")?,
                failure: matchers_from(&input.payload, "failureWhen")?,
            }),
        })
    }
}

fn matchers_from(payload: &Value, key: &str) -> OrchestratorResult<Vec<PathMatcher>> {
    match payload.get(key) {
        None => Ok(Vec::new()),
        Some(value) => {
            serde_json::from_value(value.clone()).map_err(|e| OrchestratorError::InvalidInput {
                message: format!("'{key}' is not an array of path matchers: {e}"),
            })
        }
    }
}
