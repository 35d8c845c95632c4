//! Step execution descriptors
//!
//! A step either runs manually, as a delegated durable workflow, or by
//! calling an external integration over HTTP or websocket. External
//! descriptors carry **secret aliases**, indirection names resolved
//! per tenant at execution time, never literal URLs or credentials.
//! The `token` fields exist so that a raw credential smuggled into the
//! config deserializes and can then be rejected loudly at
//! materialization time instead of being silently dropped.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// HTTP method for outbound webhook executions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        };
        write!(f, "{s}")
    }
}

/// How a step is executed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode")]
pub enum StepExecution {
    /// No automation; a human performs and confirms the step.
    #[serde(rename = "manual")]
    Manual,

    /// Delegated to a named durable workflow on the execution substrate.
    #[serde(rename = "workflow", rename_all = "camelCase")]
    Workflow {
        /// Workflow kind to start (e.g. `name-check`)
        workflow: String,
        /// Override for the tenant-derived task queue
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_queue: Option<String>,
    },

    /// Outbound signed HTTP call to a tenant-configured endpoint.
    #[serde(rename = "external:webhook", rename_all = "camelCase")]
    ExternalWebhook {
        #[serde(default)]
        method: HttpMethod,
        /// Secret alias resolving to the base URL
        url_alias: String,
        /// Secret alias resolving to a bearer token
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token_alias: Option<String>,
        /// Secret alias resolving to the HMAC signing secret
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signing_alias: Option<String>,
        /// A literal credential; always a validation failure
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
        /// Path joined onto the resolved base URL
        #[serde(default)]
        path: String,
        /// Extra static headers
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        headers: BTreeMap<String, String>,
    },

    /// Long-lived websocket integration driven by a delegate workflow.
    #[serde(rename = "external:websocket", rename_all = "camelCase")]
    ExternalWebsocket {
        /// Secret alias resolving to the websocket URL
        url_alias: String,
        /// Secret alias resolving to the connection token
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token_alias: Option<String>,
        /// A literal credential; always a validation failure
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
        /// Reference to the message schema the connector speaks
        message_schema: String,
        /// Delegate workflow that owns the connection lifecycle
        delegate_workflow: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_queue: Option<String>,
    },
}

impl StepExecution {
    /// The wire-format mode tag for this descriptor.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Workflow { .. } => "workflow",
            Self::ExternalWebhook { .. } => "external:webhook",
            Self::ExternalWebsocket { .. } => "external:websocket",
        }
    }

    /// Whether this descriptor calls out to an external integration.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Self::ExternalWebhook { .. } | Self::ExternalWebsocket { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_tags() {
        assert_eq!(StepExecution::Manual.mode(), "manual");
        let wf = StepExecution::Workflow {
            workflow: "name-check".into(),
            task_queue: None,
        };
        assert_eq!(wf.mode(), "workflow");
        assert!(!wf.is_external());
    }

    #[test]
    fn test_webhook_serde_roundtrip() {
        let json = serde_json::json!({
            "mode": "external:webhook",
            "method": "POST",
            "urlAlias": "notary-endpoint",
            "tokenAlias": "notary-token",
            "path": "/v1/jobs",
            "headers": {"X-Client": "flowcert"}
        });
        let exec: StepExecution = serde_json::from_value(json.clone()).unwrap();
        match &exec {
            StepExecution::ExternalWebhook {
                url_alias, token, ..
            } => {
                assert_eq!(url_alias, "notary-endpoint");
                assert!(token.is_none());
            }
            other => panic!("unexpected descriptor: {other:?}"),
        }
        assert!(exec.is_external());
        assert_eq!(serde_json::to_value(&exec).unwrap(), json);
    }

    #[test]
    fn test_literal_token_still_deserializes() {
        // The raw value must survive deserialization so validation can
        // reject it by name instead of silently dropping it.
        let json = serde_json::json!({
            "mode": "external:websocket",
            "urlAlias": "registry-ws",
            "token": "sk-live-1234",
            "messageSchema": "registry.v2",
            "delegateWorkflow": "external-job"
        });
        let exec: StepExecution = serde_json::from_value(json).unwrap();
        match exec {
            StepExecution::ExternalWebsocket { token, .. } => {
                assert_eq!(token.as_deref(), Some("sk-live-1234"));
            }
            other => panic!("unexpected descriptor: {other:?}"),
        }
    }
}
