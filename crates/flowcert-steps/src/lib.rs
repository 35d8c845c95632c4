//! Step workflow state machines
//!
//! Each supported step kind is a deterministic finite-state machine:
//! an event moves the machine to its next state and yields a list of
//! commands. No clocks, no network, no persistence in transitions:
//! every side effect is emitted as a [`Command`] for the execution
//! substrate to carry out, and every outcome comes back in as a
//! [`StepEvent`]. That split keeps replay semantics out of application
//! logic and makes every machine exhaustively testable.
//!
//! [`StepMachine`] is the uniform wrapper the orchestrator drives; the
//! per-kind machines live in their own modules.

pub mod command;
pub mod external;
pub mod matcher;
pub mod single;
pub mod submission;

pub use command::{ActivityKind, ActivityRequest, Command, RetryPolicy, StepEvent, StepStatus};
pub use external::{ExternalJobConfig, ExternalJobMachine, ExternalJobState};
pub use matcher::{classify, Classification, PathMatcher};
pub use single::{SingleActivityMachine, SingleState};
pub use submission::{SubmissionState, TaxSubmissionMachine, SIGNAL_MANUAL_FILING_CONFIRMED};

use serde_json::Value;

/// Signal that cancels a running step workflow.
pub const SIGNAL_CANCEL: &str = "cancel";

/// One step workflow of any supported kind.
#[derive(Clone, Debug, PartialEq)]
pub enum StepMachine {
    Single(SingleActivityMachine),
    TaxSubmission(TaxSubmissionMachine),
    ExternalJob(ExternalJobMachine),
}

impl StepMachine {
    /// Name check: one registry lookup activity.
    pub fn name_check(payload: Value) -> Self {
        Self::Single(SingleActivityMachine::new(ActivityKind::NameCheck, payload))
    }

    /// Tax clearance: one clearance-certificate activity.
    pub fn tax_clearance(payload: Value) -> Self {
        Self::Single(SingleActivityMachine::new(
            ActivityKind::TaxClearance,
            payload,
        ))
    }

    /// Document pack build: one rendering activity.
    pub fn document_pack(payload: Value) -> Self {
        Self::Single(SingleActivityMachine::new(
            ActivityKind::BuildDocumentPack,
            payload,
        ))
    }

    /// Tax submission with manual fallback.
    pub fn tax_submission(payload: Value) -> Self {
        Self::TaxSubmission(TaxSubmissionMachine::new(payload))
    }

    /// Long-running external job with matcher-classified polling.
    pub fn external_job(config: ExternalJobConfig) -> Self {
        Self::ExternalJob(ExternalJobMachine::new(config))
    }

    pub fn status(&self) -> StepStatus {
        match self {
            Self::Single(m) => m.status(),
            Self::TaxSubmission(m) => m.status(),
            Self::ExternalJob(m) => m.status(),
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match self {
            Self::Single(m) => m.result(),
            Self::TaxSubmission(m) => m.result(),
            Self::ExternalJob(m) => m.result(),
        }
    }

    /// Apply one event: advance the machine and return the side
    /// effects to execute.
    pub fn transition(&mut self, event: StepEvent) -> Vec<Command> {
        match self {
            Self::Single(m) => m.transition(event),
            Self::TaxSubmission(m) => m.transition(event),
            Self::ExternalJob(m) => m.transition(event),
        }
    }
}
