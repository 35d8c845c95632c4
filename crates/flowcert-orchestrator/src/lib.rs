//! Step orchestration: durable workflow identity, routing, and the
//! execution substrate seam
//!
//! Starting a step derives a deterministic workflow identifier
//! (`org:run:step:kind`) and a tenant-scoped task queue, so duplicate
//! starts are idempotent at the identifier level and tenants stay
//! isolated from each other's load. The [`ExecutionSubstrate`] trait is
//! the seam to a real durable-execution engine; [`InMemorySubstrate`]
//! implements the same contract in-process by driving the
//! `flowcert-steps` machines through an injected [`ActivityHandler`].

pub mod activity;
pub mod kind;
pub mod memory;
pub mod orchestrator;
pub mod routing;
pub mod substrate;

pub use activity::WebhookActivityHandler;
pub use kind::WorkflowKind;
pub use memory::{ActivityHandler, InMemorySubstrate, SIGNAL_DEADLINE_REACHED, SIGNAL_POLL};
pub use orchestrator::StepOrchestrator;
pub use routing::{task_queue, workflow_id, SearchAttributes};
pub use substrate::{
    ExecutionSubstrate, OrchestratorError, OrchestratorResult, StartCommand, WorkflowHandle,
    WorkflowSnapshot,
};
