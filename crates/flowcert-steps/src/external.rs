//! External job steps
//!
//! Start a long-running job at an external integration, then wait.
//! Polling is driven from outside (a scheduler delivers `Poll` events);
//! each poll re-issues the signed request with an incrementing
//! idempotency suffix and classifies the response with the configured
//! path matchers. A missed deadline escalates for human attention but
//! never fails the job on its own.

use crate::command::{ActivityKind, ActivityRequest, Command, StepEvent, StepStatus};
use crate::matcher::{classify, Classification, PathMatcher};
use serde_json::Value;

/// Configuration for one external job step.
#[derive(Clone, Debug, PartialEq)]
pub struct ExternalJobConfig {
    /// Payload for the start request
    pub start_payload: Value,
    /// Matchers that mark the job finished successfully
    pub success: Vec<PathMatcher>,
    /// Matchers that mark the job terminally failed
    pub failure: Vec<PathMatcher>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExternalJobState {
    Pending,
    Starting,
    /// Job started; `job` is the start response used as poll payload.
    Waiting { job: Value, polls: u32 },
    PollInFlight { job: Value, polls: u32 },
    Completed { result: Value },
    Failed { error: String },
    Cancelled,
}

/// Start → wait → poll until a matcher fires.
#[derive(Clone, Debug, PartialEq)]
pub struct ExternalJobMachine {
    config: ExternalJobConfig,
    state: ExternalJobState,
}

impl ExternalJobMachine {
    pub fn new(config: ExternalJobConfig) -> Self {
        Self {
            config,
            state: ExternalJobState::Pending,
        }
    }

    pub fn status(&self) -> StepStatus {
        match &self.state {
            ExternalJobState::Pending => StepStatus::Pending,
            ExternalJobState::Starting | ExternalJobState::PollInFlight { .. } => {
                StepStatus::Running
            }
            ExternalJobState::Waiting { .. } => StepStatus::Waiting,
            ExternalJobState::Completed { .. } => StepStatus::Completed,
            ExternalJobState::Failed { .. } => StepStatus::Failed,
            ExternalJobState::Cancelled => StepStatus::Cancelled,
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.state {
            ExternalJobState::Completed { result } => Some(result),
            _ => None,
        }
    }

    /// Poll attempts issued so far.
    pub fn polls(&self) -> u32 {
        match &self.state {
            ExternalJobState::Waiting { polls, .. }
            | ExternalJobState::PollInFlight { polls, .. } => *polls,
            _ => 0,
        }
    }

    pub fn transition(&mut self, event: StepEvent) -> Vec<Command> {
        let state = std::mem::replace(&mut self.state, ExternalJobState::Pending);
        match (state, event) {
            (ExternalJobState::Pending, StepEvent::Start) => {
                self.state = ExternalJobState::Starting;
                vec![
                    Command::PersistProgress {
                        status: StepStatus::Running,
                        result: None,
                    },
                    Command::RunActivity(ActivityRequest::new(
                        ActivityKind::StartExternalJob,
                        self.config.start_payload.clone(),
                    )),
                ]
            }

            (ExternalJobState::Starting, StepEvent::ActivitySucceeded { output }) => {
                self.state = ExternalJobState::Waiting {
                    job: output,
                    polls: 0,
                };
                vec![Command::PersistProgress {
                    status: StepStatus::Waiting,
                    result: None,
                }]
            }

            (ExternalJobState::Waiting { job, polls }, StepEvent::Poll) => {
                let attempt = polls + 1;
                let poll = ActivityRequest::new(ActivityKind::PollExternalJob, job.clone())
                    .with_suffix(format!("poll-{attempt}"));
                self.state = ExternalJobState::PollInFlight {
                    job,
                    polls: attempt,
                };
                vec![Command::RunActivity(poll)]
            }

            (
                ExternalJobState::PollInFlight { job, polls },
                StepEvent::ActivitySucceeded { output },
            ) => match classify(&output, &self.config.success, &self.config.failure) {
                Classification::Success => {
                    self.state = ExternalJobState::Completed {
                        result: output.clone(),
                    };
                    vec![Command::PersistProgress {
                        status: StepStatus::Completed,
                        result: Some(output),
                    }]
                }
                Classification::Failure => {
                    self.state = ExternalJobState::Failed {
                        error: "external job reported a terminal failure".into(),
                    };
                    vec![Command::PersistProgress {
                        status: StepStatus::Failed,
                        result: Some(output),
                    }]
                }
                Classification::Indeterminate => {
                    self.state = ExternalJobState::Waiting { job, polls };
                    vec![Command::PersistProgress {
                        status: StepStatus::Waiting,
                        result: None,
                    }]
                }
            },

            (ExternalJobState::Waiting { job, polls }, StepEvent::DeadlineReached) => {
                self.state = ExternalJobState::Waiting { job, polls };
                vec![Command::Escalate {
                    reason: format!("external job exceeded its deadline after {polls} polls"),
                }]
            }

            (
                ExternalJobState::Starting | ExternalJobState::PollInFlight { .. },
                StepEvent::ActivityFailed { error },
            ) => {
                self.state = ExternalJobState::Failed { error };
                vec![Command::PersistProgress {
                    status: StepStatus::Failed,
                    result: None,
                }]
            }

            (state, StepEvent::Cancel)
                if !matches!(
                    &state,
                    ExternalJobState::Completed { .. }
                        | ExternalJobState::Failed { .. }
                        | ExternalJobState::Cancelled
                ) =>
            {
                self.state = ExternalJobState::Cancelled;
                vec![Command::PersistProgress {
                    status: StepStatus::Cancelled,
                    result: None,
                }]
            }

            (state, event) => {
                self.state = state;
                tracing::debug!(?event, status = ?self.status(), "event ignored in current state");
                vec![]
            }
        }
    }
}
