//! The durable execution substrate seam
//!
//! The orchestrator never talks to a concrete durable-execution engine
//! directly; it hands fully prepared start commands to this trait. The
//! substrate guarantees at-least-once ordered replay and identifier
//! uniqueness; the in-memory implementation in this crate provides the
//! same contract for tests and single-process deployments.

use crate::routing::SearchAttributes;
use async_trait::async_trait;
use flowcert_steps::{StepMachine, StepStatus};
use flowcert_types::StepWorkflowInput;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// A second start against an existing workflow identifier. The
    /// caller treats the step as already in flight.
    #[error("workflow '{workflow_id}' is already running")]
    AlreadyRunning { workflow_id: String },

    #[error("workflow '{workflow_id}' not found")]
    NotFound { workflow_id: String },

    /// The workflow input cannot configure a machine of the requested
    /// kind. Rejected before anything reaches the substrate.
    #[error("invalid workflow input: {message}")]
    InvalidInput { message: String },

    #[error("substrate failure for workflow '{workflow_id}': {message}")]
    Substrate {
        workflow_id: String,
        message: String,
    },
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// Everything the substrate needs to begin one execution.
#[derive(Clone, Debug)]
pub struct StartCommand {
    pub workflow_id: String,
    pub task_queue: String,
    pub input: StepWorkflowInput,
    pub machine: StepMachine,
    pub search_attributes: SearchAttributes,
}

/// Returned from a successful start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkflowHandle {
    pub workflow_id: String,
    /// Substrate-assigned identifier for this particular execution.
    pub execution_id: String,
}

/// Point-in-time view of an execution, as seen after the most recently
/// applied transition.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkflowSnapshot {
    pub status: StepStatus,
    pub result: Option<Value>,
}

/// A durable-execution backend.
#[async_trait]
pub trait ExecutionSubstrate: Send + Sync {
    /// Begin an execution. Must reject a duplicate workflow identifier
    /// with [`OrchestratorError::AlreadyRunning`], never duplicate it.
    async fn start(&self, command: StartCommand) -> OrchestratorResult<WorkflowHandle>;

    /// Deliver a named signal and return the state after the machine
    /// has absorbed it.
    async fn signal(
        &self,
        workflow_id: &str,
        signal: &str,
        payload: Value,
    ) -> OrchestratorResult<WorkflowSnapshot>;

    /// Observe current status and result.
    async fn query(&self, workflow_id: &str) -> OrchestratorResult<WorkflowSnapshot>;
}
