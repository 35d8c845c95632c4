//! In-memory execution substrate
//!
//! Drives the step machines directly: activity commands are executed
//! through an injected [`ActivityHandler`] with the request's bounded
//! retry policy, progress and escalation commands are recorded, and the
//! machine is advanced until it suspends (awaiting signal, waiting) or
//! reaches a terminal state. Each workflow sits behind its own async
//! mutex; the registry lock is held only for lookup and insertion,
//! never across an activity, so a slow handler in one workflow cannot
//! block starts, signals, or queries for any other.

use crate::substrate::{
    ExecutionSubstrate, OrchestratorError, OrchestratorResult, StartCommand, WorkflowHandle,
    WorkflowSnapshot,
};
use async_trait::async_trait;
use flowcert_steps::{
    ActivityRequest, Command, StepEvent, StepMachine, StepStatus, SIGNAL_CANCEL,
};
use flowcert_types::StepWorkflowInput;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Signal that asks a waiting external job to poll again. Delivered by
/// an external scheduler.
pub const SIGNAL_POLL: &str = "poll";
/// Signal that marks a waiting step's deadline as passed.
pub const SIGNAL_DEADLINE_REACHED: &str = "deadline-reached";

/// Executes activity requests on behalf of the substrate. Network,
/// clock, and persistence access all live behind this seam.
#[async_trait]
pub trait ActivityHandler: Send + Sync {
    async fn execute(
        &self,
        input: &StepWorkflowInput,
        request: &ActivityRequest,
    ) -> Result<Value, String>;
}

struct WorkflowEntry {
    machine: StepMachine,
    input: StepWorkflowInput,
    task_queue: String,
    progress: Vec<(StepStatus, Option<Value>)>,
    escalations: Vec<String>,
}

/// Single-process substrate implementation.
pub struct InMemorySubstrate {
    handler: Arc<dyn ActivityHandler>,
    workflows: Mutex<HashMap<String, Arc<Mutex<WorkflowEntry>>>>,
}

impl InMemorySubstrate {
    pub fn new(handler: Arc<dyn ActivityHandler>) -> Self {
        Self {
            handler,
            workflows: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a workflow's entry, releasing the registry lock before
    /// returning so callers never hold it across an activity.
    async fn entry(&self, workflow_id: &str) -> OrchestratorResult<Arc<Mutex<WorkflowEntry>>> {
        let workflows = self.workflows.lock().await;
        workflows
            .get(workflow_id)
            .cloned()
            .ok_or_else(|| OrchestratorError::NotFound {
                workflow_id: workflow_id.to_string(),
            })
    }

    /// Escalation reasons recorded for a workflow, in order.
    pub async fn escalations(&self, workflow_id: &str) -> OrchestratorResult<Vec<String>> {
        let entry = self.entry(workflow_id).await?;
        let entry = entry.lock().await;
        Ok(entry.escalations.clone())
    }

    /// Progress records persisted for a workflow, in order.
    pub async fn progress(
        &self,
        workflow_id: &str,
    ) -> OrchestratorResult<Vec<(StepStatus, Option<Value>)>> {
        let entry = self.entry(workflow_id).await?;
        let entry = entry.lock().await;
        Ok(entry.progress.clone())
    }

    /// Task queue an execution was routed to.
    pub async fn task_queue(&self, workflow_id: &str) -> OrchestratorResult<String> {
        let entry = self.entry(workflow_id).await?;
        let entry = entry.lock().await;
        Ok(entry.task_queue.clone())
    }

    /// Run one activity with its bounded retry policy.
    async fn run_activity(
        &self,
        input: &StepWorkflowInput,
        request: &ActivityRequest,
    ) -> StepEvent {
        let max_attempts = request.retry.max_attempts.max(1);
        let mut last_error = String::new();
        for attempt in 1..=max_attempts {
            match self.handler.execute(input, request).await {
                Ok(output) => return StepEvent::ActivitySucceeded { output },
                Err(error) => {
                    tracing::warn!(
                        activity = ?request.activity,
                        attempt,
                        max_attempts,
                        %error,
                        "activity attempt failed"
                    );
                    last_error = error;
                }
            }
        }
        StepEvent::ActivityFailed { error: last_error }
    }

    /// Feed an event into a machine, executing emitted commands and
    /// chaining follow-up activity events until the machine suspends.
    async fn drive(&self, entry: &mut WorkflowEntry, event: StepEvent) {
        let mut next = Some(event);
        while let Some(event) = next.take() {
            let commands = entry.machine.transition(event);

            for command in commands {
                match command {
                    Command::RunActivity(request) => {
                        // Machines request at most one activity per
                        // transition; its outcome is the next event.
                        next = Some(self.run_activity(&entry.input, &request).await);
                    }
                    Command::PersistProgress { status, result } => {
                        entry.progress.push((status, result));
                    }
                    Command::Escalate { reason } => {
                        tracing::warn!(%reason, "step escalated");
                        entry.escalations.push(reason);
                    }
                }
            }
        }
    }
}

#[async_trait]
impl ExecutionSubstrate for InMemorySubstrate {
    async fn start(&self, command: StartCommand) -> OrchestratorResult<WorkflowHandle> {
        let entry = Arc::new(Mutex::new(WorkflowEntry {
            machine: command.machine,
            input: command.input,
            task_queue: command.task_queue,
            progress: Vec::new(),
            escalations: Vec::new(),
        }));

        // Register before driving so a concurrent duplicate start is
        // rejected even while the first start's activities run.
        {
            let mut workflows = self.workflows.lock().await;
            if workflows.contains_key(&command.workflow_id) {
                return Err(OrchestratorError::AlreadyRunning {
                    workflow_id: command.workflow_id,
                });
            }
            workflows.insert(command.workflow_id.clone(), Arc::clone(&entry));
        }

        let mut entry = entry.lock().await;
        self.drive(&mut entry, StepEvent::Start).await;

        tracing::info!(
            workflow_id = %command.workflow_id,
            task_queue = %entry.task_queue,
            run_id = %command.search_attributes.run_id,
            status = ?entry.machine.status(),
            "workflow started"
        );

        Ok(WorkflowHandle {
            workflow_id: command.workflow_id,
            execution_id: uuid::Uuid::new_v4().to_string(),
        })
    }

    async fn signal(
        &self,
        workflow_id: &str,
        signal: &str,
        payload: Value,
    ) -> OrchestratorResult<WorkflowSnapshot> {
        let entry = self.entry(workflow_id).await?;
        let mut entry = entry.lock().await;

        let event = match signal {
            SIGNAL_CANCEL => StepEvent::Cancel,
            SIGNAL_POLL => StepEvent::Poll,
            SIGNAL_DEADLINE_REACHED => StepEvent::DeadlineReached,
            name => StepEvent::SignalReceived {
                name: name.to_string(),
                payload,
            },
        };
        self.drive(&mut entry, event).await;

        Ok(WorkflowSnapshot {
            status: entry.machine.status(),
            result: entry.machine.result().cloned(),
        })
    }

    async fn query(&self, workflow_id: &str) -> OrchestratorResult<WorkflowSnapshot> {
        let entry = self.entry(workflow_id).await?;
        let entry = entry.lock().await;
        Ok(WorkflowSnapshot {
            status: entry.machine.status(),
            result: entry.machine.result().cloned(),
        })
    }
}
