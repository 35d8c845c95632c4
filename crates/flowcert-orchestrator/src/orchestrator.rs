//! The orchestrator façade
//!
//! Derives the deterministic workflow identifier and tenant task queue,
//! builds the machine for the requested kind, and hands the prepared
//! start command to the substrate. Signals and queries pass through by
//! workflow identifier.

use crate::kind::WorkflowKind;
use crate::routing::{task_queue, workflow_id, SearchAttributes};
use crate::substrate::{
    ExecutionSubstrate, OrchestratorResult, StartCommand, WorkflowHandle, WorkflowSnapshot,
};
use flowcert_types::StepWorkflowInput;
use serde_json::Value;

pub struct StepOrchestrator<S> {
    substrate: S,
    environment: String,
}

impl<S: ExecutionSubstrate> StepOrchestrator<S> {
    pub fn new(substrate: S, environment: impl Into<String>) -> Self {
        Self {
            substrate,
            environment: environment.into(),
        }
    }

    /// Access the underlying substrate.
    pub fn substrate(&self) -> &S {
        &self.substrate
    }

    /// The identifier `start` would use for this input, for callers
    /// that need it before starting.
    pub fn workflow_id_for(&self, kind: WorkflowKind, input: &StepWorkflowInput) -> String {
        workflow_id(&input.org_id, &input.run_id, &input.step_key, kind)
    }

    /// Start a step workflow. Starting the same (org, run, step, kind)
    /// twice derives the same identifier; the substrate rejects the
    /// second start as already running.
    pub async fn start(
        &self,
        kind: WorkflowKind,
        input: StepWorkflowInput,
    ) -> OrchestratorResult<WorkflowHandle> {
        let id = self.workflow_id_for(kind, &input);
        let queue = task_queue(&input.tenant_id);
        let attrs = SearchAttributes::new(
            &input.run_id,
            &input.org_id,
            &input.step_key,
            self.environment.clone(),
        );
        let machine = kind.build_machine(&input)?;

        tracing::info!(
            workflow_id = %id,
            task_queue = %queue,
            kind = %kind,
            "starting step workflow"
        );
        self.substrate
            .start(StartCommand {
                workflow_id: id,
                task_queue: queue,
                input,
                machine,
                search_attributes: attrs,
            })
            .await
    }

    pub async fn signal(
        &self,
        workflow_id: &str,
        signal: &str,
        payload: Value,
    ) -> OrchestratorResult<WorkflowSnapshot> {
        self.substrate.signal(workflow_id, signal, payload).await
    }

    pub async fn query(&self, workflow_id: &str) -> OrchestratorResult<WorkflowSnapshot> {
        self.substrate.query(workflow_id).await
    }
}
