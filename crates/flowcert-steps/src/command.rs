//! Events, commands, and activity descriptions
//!
//! Machines consume [`StepEvent`]s and emit [`Command`]s. The substrate
//! layer executes commands (runs activities, persists progress, records
//! escalations) and feeds the outcomes back as further events. Retry of
//! a failed activity is the substrate's job: a machine only ever sees
//! `ActivityFailed` after the bounded retry policy is exhausted.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Observable status of a step workflow, exposed through queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    /// Blocked on an external confirmation signal
    AwaitingSignal,
    /// Started an external job; must be re-polled until terminal
    Waiting,
    Completed,
    Failed,
    Cancelled,
}

impl StepStatus {
    /// Terminal states accept no further events.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// The activities a step machine can request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityKind {
    NameCheck,
    TaxClearance,
    BuildDocumentPack,
    SubmitFiling,
    PollFiling,
    StartExternalJob,
    PollExternalJob,
}

/// Bounded retry policy attached to every activity request. The
/// substrate re-runs a failing activity up to `max_attempts` times
/// before reporting failure to the machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

/// A request to run one activity outside the machine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityRequest {
    pub activity: ActivityKind,
    pub payload: Value,
    pub retry: RetryPolicy,
    /// Distinguishes repeated requests from one step, e.g. successive
    /// polls. Flows into the outbound idempotency key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_suffix: Option<String>,
}

impl ActivityRequest {
    pub fn new(activity: ActivityKind, payload: Value) -> Self {
        Self {
            activity,
            payload,
            retry: RetryPolicy::default(),
            idempotency_suffix: None,
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.idempotency_suffix = Some(suffix.into());
        self
    }
}

/// A side effect requested by a transition. Executed by the substrate,
/// never inside transition logic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Command {
    RunActivity(ActivityRequest),
    /// Record the step's progress with the external progress collaborator.
    PersistProgress {
        status: StepStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
    },
    /// Record an audit event for a deadline breach. Does not fail the
    /// workflow.
    Escalate { reason: String },
}

/// An input to a step machine.
#[derive(Clone, Debug, PartialEq)]
pub enum StepEvent {
    /// Begin executing the step.
    Start,
    /// A requested activity finished successfully.
    ActivitySucceeded { output: Value },
    /// A requested activity failed after its retry policy was exhausted.
    ActivityFailed { error: String },
    /// An external signal arrived.
    SignalReceived { name: String, payload: Value },
    /// An external scheduler asked a waiting step to poll again.
    Poll,
    /// The step's deadline passed without a terminal outcome.
    DeadlineReached,
    /// A cancellation signal.
    Cancel,
}
