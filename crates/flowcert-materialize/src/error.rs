//! Error types for materialization
//!
//! Validation-class errors (resolution, overlay, config) fail fast and
//! loud at materialization time, before any step execution begins. Each
//! names the exact offending entity so callers never see a generic
//! failure.

use flowcert_overlay::OverlayApplicationError;

/// A reference that could not be resolved to an immutable version
/// record. Fatal to materialization, never retried automatically.
#[derive(Debug, thiserror::Error)]
pub enum VersionResolutionError {
    #[error("workflow definition '{id}' version '{version}' not found")]
    WorkflowDefinitionNotFound { id: String, version: String },

    #[error("overlay '{id}' version '{version}' not found")]
    OverlayNotFound { id: String, version: String },

    #[error("rule '{rule_id}' referenced by step '{step_id}' has no version binding")]
    UnboundRule { rule_id: String, step_id: String },

    #[error("rule '{rule_id}' not found for selector '{selector}'")]
    RuleNotFound { rule_id: String, selector: String },

    #[error("template '{template_id}' referenced by step '{step_id}' has no version binding")]
    UnboundTemplate {
        template_id: String,
        step_id: String,
    },

    #[error("template '{template_id}' not found for selector '{selector}'")]
    TemplateNotFound {
        template_id: String,
        selector: String,
    },
}

/// A literal URL or credential found where a secret alias was
/// required. Security-relevant: never silently coerced.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionConfigError {
    #[error(
        "step '{step_id}': '{field}' must name a urlAlias secret, found a literal URL value"
    )]
    LiteralUrl { step_id: String, field: String },

    #[error("step '{step_id}': raw token in '{field}', use a secret alias instead of a literal credential")]
    RawToken { step_id: String, field: String },

    #[error("step '{step_id}': '{field}' is not a valid secret alias: '{value}'")]
    MalformedAlias {
        step_id: String,
        field: String,
        value: String,
    },
}

/// The version data source itself failed (transport, backend).
#[derive(Debug, thiserror::Error)]
#[error("data source failure: {0}")]
pub struct DataSourceError(pub String);

/// Anything that can abort a materialization.
#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    #[error(transparent)]
    Resolution(#[from] VersionResolutionError),

    #[error(transparent)]
    Overlay(#[from] OverlayApplicationError),

    #[error(transparent)]
    ExecutionConfig(#[from] ExecutionConfigError),

    #[error("merged document is not a valid workflow graph: {0}")]
    InvalidMergedGraph(String),

    #[error(transparent)]
    DataSource(#[from] DataSourceError),
}

pub type MaterializeResult<T> = Result<T, MaterializeError>;
