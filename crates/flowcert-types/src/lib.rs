//! Core data model for the flowcert engine
//!
//! A tenant-specific compliance workflow is assembled from versioned
//! building blocks: a base workflow definition, tenant overlay patches,
//! versioned rules, and versioned document templates. The result of
//! assembly is frozen into a checksummed [`WorkflowLockfile`], which is
//! the sole persisted proof of exactly what was combined for a run.
//!
//! Everything in this crate is plain data: identifiers, the workflow
//! graph, overlay patch operations, immutable version records, the
//! lockfile, verification evidence, and the input handed to a durable
//! step workflow. Behavior lives in the sibling crates.

pub mod execution;
pub mod graph;
pub mod ids;
pub mod input;
pub mod lockfile;
pub mod verification;
pub mod version;

pub use execution::{HttpMethod, StepExecution};
pub use graph::{RuleRef, Step, WorkflowGraph};
pub use ids::{OrgId, RunId, StepKey, TenantId};
pub use input::StepWorkflowInput;
pub use lockfile::{LockedRef, LockedRule, WorkflowLockfile};
pub use verification::{RuleFreshness, RuleVerification, SourceEvidence, VerificationResult};
pub use version::{
    OverlayPatch, OverlayRef, OverlayVersion, PatchOp, RuleSourceSnapshot, RuleVersion,
    TemplateVersion, WorkflowDefVersion,
};
