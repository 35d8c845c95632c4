//! Materialization: version resolution and lockfile assembly
//!
//! `materialize` turns a workflow id + version + overlay references
//! into a frozen, reproducible [`flowcert_types::WorkflowLockfile`]
//! plus the concrete merged step graph. The pipeline:
//!
//! 1. resolve the workflow-definition version record,
//! 2. apply each overlay's patch in caller order,
//! 3. resolve every rule and template reachable from the merged graph
//!    through the definition's binding selectors,
//! 4. assemble the lockfile,
//! 5. validate every execution descriptor (alias-only invariant).
//!
//! Any unresolved reference or invalid descriptor fails the whole
//! materialization; partial lockfiles are never produced. The version
//! data source is queried fresh on every call; staleness detection is
//! the feature being built, so nothing is cached client-side.

pub mod error;
pub mod materializer;
pub mod source;
pub mod validate;

pub use error::{
    DataSourceError, ExecutionConfigError, MaterializeError, MaterializeResult,
    VersionResolutionError,
};
pub use materializer::{materialize, Materialized};
pub use source::{DataSource, InMemoryDataSource};
pub use validate::validate_execution;
