//! Execution descriptor validation: the alias-only invariant
//!
//! External execution descriptors must reference secret aliases, never
//! literal URLs or credentials. A literal slipping through here would
//! end up frozen into run configuration and handed to workers, so a
//! violation is a hard materialization failure.

use crate::error::ExecutionConfigError;
use flowcert_types::{Step, StepExecution};

/// Validate a step's execution descriptor, if it has one.
pub fn validate_execution(step: &Step) -> Result<(), ExecutionConfigError> {
    let Some(execution) = &step.execution else {
        return Ok(());
    };

    match execution {
        StepExecution::Manual | StepExecution::Workflow { .. } => Ok(()),

        StepExecution::ExternalWebhook {
            url_alias,
            token_alias,
            signing_alias,
            token,
            ..
        } => {
            check_url_alias(&step.id, "urlAlias", url_alias)?;
            check_no_raw_token(&step.id, token.as_deref())?;
            check_alias(&step.id, "tokenAlias", token_alias.as_deref())?;
            check_alias(&step.id, "signingAlias", signing_alias.as_deref())?;
            Ok(())
        }

        StepExecution::ExternalWebsocket {
            url_alias,
            token_alias,
            token,
            ..
        } => {
            check_url_alias(&step.id, "urlAlias", url_alias)?;
            check_no_raw_token(&step.id, token.as_deref())?;
            check_alias(&step.id, "tokenAlias", token_alias.as_deref())?;
            Ok(())
        }
    }
}

fn check_url_alias(step_id: &str, field: &str, value: &str) -> Result<(), ExecutionConfigError> {
    if value.contains("://") {
        return Err(ExecutionConfigError::LiteralUrl {
            step_id: step_id.to_string(),
            field: field.to_string(),
        });
    }
    check_alias(step_id, field, Some(value))
}

fn check_no_raw_token(step_id: &str, token: Option<&str>) -> Result<(), ExecutionConfigError> {
    if token.is_some() {
        return Err(ExecutionConfigError::RawToken {
            step_id: step_id.to_string(),
            field: "token".to_string(),
        });
    }
    Ok(())
}

/// An alias is a short indirection name: alphanumerics plus `.`, `-`,
/// `_`. Anything else looks like a smuggled literal value.
fn check_alias(
    step_id: &str,
    field: &str,
    value: Option<&str>,
) -> Result<(), ExecutionConfigError> {
    let Some(value) = value else {
        return Ok(());
    };
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
    if !valid {
        return Err(ExecutionConfigError::MalformedAlias {
            step_id: step_id.to_string(),
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}
