//! Submission with manual fallback (tax filing)
//!
//! Submit, poll once, and if the filing was not accepted block on a
//! manual confirmation signal. Completion after the signal merges the
//! signal payload into the submission result, so the record shows both
//! what was submitted and how it was confirmed.

use crate::command::{ActivityKind, ActivityRequest, Command, StepEvent, StepStatus};
use serde_json::Value;

/// Signal delivered when a human confirms the filing was completed
/// manually.
pub const SIGNAL_MANUAL_FILING_CONFIRMED: &str = "manual-filing-confirmed";

#[derive(Clone, Debug, PartialEq)]
pub enum SubmissionState {
    Pending,
    Submitting,
    Polling { submission: Value },
    AwaitingConfirmation { submission: Value },
    Completed { result: Value },
    Failed { error: String },
    Cancelled,
}

/// Submit → poll once → accepted or manual confirmation.
#[derive(Clone, Debug, PartialEq)]
pub struct TaxSubmissionMachine {
    payload: Value,
    state: SubmissionState,
}

impl TaxSubmissionMachine {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            state: SubmissionState::Pending,
        }
    }

    pub fn status(&self) -> StepStatus {
        match &self.state {
            SubmissionState::Pending => StepStatus::Pending,
            SubmissionState::Submitting | SubmissionState::Polling { .. } => StepStatus::Running,
            SubmissionState::AwaitingConfirmation { .. } => StepStatus::AwaitingSignal,
            SubmissionState::Completed { .. } => StepStatus::Completed,
            SubmissionState::Failed { .. } => StepStatus::Failed,
            SubmissionState::Cancelled => StepStatus::Cancelled,
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.state {
            SubmissionState::Completed { result } => Some(result),
            _ => None,
        }
    }

    pub fn transition(&mut self, event: StepEvent) -> Vec<Command> {
        let state = std::mem::replace(&mut self.state, SubmissionState::Pending);
        match (state, event) {
            (SubmissionState::Pending, StepEvent::Start) => {
                self.state = SubmissionState::Submitting;
                vec![
                    Command::PersistProgress {
                        status: StepStatus::Running,
                        result: None,
                    },
                    Command::RunActivity(ActivityRequest::new(
                        ActivityKind::SubmitFiling,
                        self.payload.clone(),
                    )),
                ]
            }

            (SubmissionState::Submitting, StepEvent::ActivitySucceeded { output }) => {
                let poll = ActivityRequest::new(ActivityKind::PollFiling, output.clone())
                    .with_suffix("poll-1");
                self.state = SubmissionState::Polling { submission: output };
                vec![Command::RunActivity(poll)]
            }

            (SubmissionState::Polling { submission }, StepEvent::ActivitySucceeded { output }) => {
                if is_accepted(&output) {
                    self.state = SubmissionState::Completed {
                        result: output.clone(),
                    };
                    vec![Command::PersistProgress {
                        status: StepStatus::Completed,
                        result: Some(output),
                    }]
                } else {
                    self.state = SubmissionState::AwaitingConfirmation { submission };
                    vec![Command::PersistProgress {
                        status: StepStatus::AwaitingSignal,
                        result: None,
                    }]
                }
            }

            (
                SubmissionState::AwaitingConfirmation { submission },
                StepEvent::SignalReceived { name, payload },
            ) if name == SIGNAL_MANUAL_FILING_CONFIRMED => {
                let result = merge_results(submission, payload);
                self.state = SubmissionState::Completed {
                    result: result.clone(),
                };
                vec![Command::PersistProgress {
                    status: StepStatus::Completed,
                    result: Some(result),
                }]
            }

            (
                SubmissionState::Submitting | SubmissionState::Polling { .. },
                StepEvent::ActivityFailed { error },
            ) => {
                self.state = SubmissionState::Failed { error };
                vec![Command::PersistProgress {
                    status: StepStatus::Failed,
                    result: None,
                }]
            }

            (state, StepEvent::Cancel)
                if !matches!(
                    &state,
                    SubmissionState::Completed { .. }
                        | SubmissionState::Failed { .. }
                        | SubmissionState::Cancelled
                ) =>
            {
                self.state = SubmissionState::Cancelled;
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

/// A poll response counts as accepted when it says so at top level.
fn is_accepted(output: &Value) -> bool {
    output
        .get("accepted")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Shallow merge: submission fields first, signal payload wins on
/// collision. Non-object payloads replace the submission wholesale.
fn merge_results(submission: Value, payload: Value) -> Value {
    match (submission, payload) {
        (Value::Object(mut base), Value::Object(extra)) => {
            for (key, value) in extra {
                base.insert(key, value);
            }
            Value::Object(base)
        }
        (_, payload) => payload,
    }
}
