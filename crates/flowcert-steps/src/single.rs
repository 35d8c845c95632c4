//! Single-activity steps: name check, tax clearance, document pack
//!
//! The simplest shape: one activity call, completed on success, failed
//! when the activity's retry policy is exhausted.

use crate::command::{ActivityKind, ActivityRequest, Command, StepEvent, StepStatus};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub enum SingleState {
    Pending,
    Running,
    Completed { result: Value },
    Failed { error: String },
    Cancelled,
}

/// A step that runs exactly one activity.
#[derive(Clone, Debug, PartialEq)]
pub struct SingleActivityMachine {
    activity: ActivityKind,
    payload: Value,
    state: SingleState,
}

impl SingleActivityMachine {
    pub fn new(activity: ActivityKind, payload: Value) -> Self {
        Self {
            activity,
            payload,
            state: SingleState::Pending,
        }
    }

    pub fn status(&self) -> StepStatus {
        match &self.state {
            SingleState::Pending => StepStatus::Pending,
            SingleState::Running => StepStatus::Running,
            SingleState::Completed { .. } => StepStatus::Completed,
            SingleState::Failed { .. } => StepStatus::Failed,
            SingleState::Cancelled => StepStatus::Cancelled,
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.state {
            SingleState::Completed { result } => Some(result),
            _ => None,
        }
    }

    /// Apply one event: move to the next state and return the side
    /// effects to execute. Events that make no sense in the current
    /// state are ignored.
    pub fn transition(&mut self, event: StepEvent) -> Vec<Command> {
        match (&self.state, event) {
            (SingleState::Pending, StepEvent::Start) => {
                let request = ActivityRequest::new(self.activity, self.payload.clone());
                self.state = SingleState::Running;
                vec![
                    Command::PersistProgress {
                        status: StepStatus::Running,
                        result: None,
                    },
                    Command::RunActivity(request),
                ]
            }

            (SingleState::Running, StepEvent::ActivitySucceeded { output }) => {
                self.state = SingleState::Completed {
                    result: output.clone(),
                };
                vec![Command::PersistProgress {
                    status: StepStatus::Completed,
                    result: Some(output),
                }]
            }

            (SingleState::Running, StepEvent::ActivityFailed { error }) => {
                self.state = SingleState::Failed { error };
                vec![Command::PersistProgress {
                    status: StepStatus::Failed,
                    result: None,
                }]
            }

            (state, StepEvent::Cancel)
                if !matches!(
                    state,
                    SingleState::Completed { .. }
                        | SingleState::Failed { .. }
                        | SingleState::Cancelled
                ) =>
            {
                self.state = SingleState::Cancelled;
                vec![Command::PersistProgress {
                    status: StepStatus::Cancelled,
                    result: None,
                }]
            }

            (_, event) => {
                tracing::debug!(?event, status = ?self.status(), "event ignored in current state");
                vec![]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_machine() -> SingleActivityMachine {
        SingleActivityMachine::new(ActivityKind::NameCheck, json!({"name": "Acme GmbH"}))
    }

    #[test]
    fn test_happy_path() {
        let mut machine = make_machine();
        assert_eq!(machine.status(), StepStatus::Pending);

        let commands = machine.transition(StepEvent::Start);
        assert_eq!(machine.status(), StepStatus::Running);
        assert!(matches!(
            &commands[1],
            Command::RunActivity(request) if request.activity == ActivityKind::NameCheck
        ));

        let commands = machine.transition(StepEvent::ActivitySucceeded {
            output: json!({"available": true}),
        });
        assert_eq!(machine.status(), StepStatus::Completed);
        assert_eq!(machine.result().unwrap()["available"], true);
        assert!(matches!(
            &commands[0],
            Command::PersistProgress { status: StepStatus::Completed, .. }
        ));
    }

    #[test]
    fn test_exhausted_retries_fail_the_step() {
        let mut machine = make_machine();
        machine.transition(StepEvent::Start);
        machine.transition(StepEvent::ActivityFailed {
            error: "registry unreachable".into(),
        });
        assert_eq!(machine.status(), StepStatus::Failed);
        assert!(machine.result().is_none());
    }

    #[test]
    fn test_cancel_interrupts_running() {
        let mut machine = make_machine();
        machine.transition(StepEvent::Start);
        let commands = machine.transition(StepEvent::Cancel);
        assert_eq!(machine.status(), StepStatus::Cancelled);
        assert!(matches!(
            &commands[0],
            Command::PersistProgress { status: StepStatus::Cancelled, .. }
        ));
    }

    #[test]
    fn test_terminal_state_ignores_events() {
        let mut machine = make_machine();
        machine.transition(StepEvent::Start);
        machine.transition(StepEvent::ActivitySucceeded { output: json!({}) });
        let commands = machine.transition(StepEvent::Cancel);
        assert_eq!(machine.status(), StepStatus::Completed);
        assert!(commands.is_empty());
    }

    #[test]
    fn test_stray_events_are_ignored() {
        let mut machine = make_machine();
        let commands = machine.transition(StepEvent::Poll);
        assert_eq!(machine.status(), StepStatus::Pending);
        assert!(commands.is_empty());
    }
}
