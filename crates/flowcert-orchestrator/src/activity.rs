//! Webhook-backed activity execution
//!
//! Bridges the machines' external-job activities to the signed HTTP
//! client: the step's locked execution descriptor supplies the aliases,
//! method, path, and static headers, the activity request supplies the
//! payload and the idempotency suffix, and the response body becomes
//! the activity output the machine classifies. Errors stay strings at
//! this seam; the machine only needs to know the attempt failed.

use crate::memory::ActivityHandler;
use async_trait::async_trait;
use flowcert_steps::{ActivityKind, ActivityRequest};
use flowcert_types::{StepExecution, StepWorkflowInput};
use flowcert_webhook::{RequestContext, SignedHttpClient, WebhookRequest};
use serde_json::Value;
use std::collections::HashMap;

/// Executes `start-external-job` / `poll-external-job` activities by
/// delivering the payload to the step's configured webhook endpoint.
pub struct WebhookActivityHandler {
    client: SignedHttpClient,
    endpoints: HashMap<String, StepExecution>,
}

impl WebhookActivityHandler {
    pub fn new(client: SignedHttpClient) -> Self {
        Self {
            client,
            endpoints: HashMap::new(),
        }
    }

    /// Register a step's execution descriptor, as taken from the
    /// materialized step graph.
    pub fn with_endpoint(mut self, step_key: impl Into<String>, execution: StepExecution) -> Self {
        self.endpoints.insert(step_key.into(), execution);
        self
    }
}

#[async_trait]
impl ActivityHandler for WebhookActivityHandler {
    async fn execute(
        &self,
        input: &StepWorkflowInput,
        request: &ActivityRequest,
    ) -> Result<Value, String> {
        match request.activity {
            ActivityKind::StartExternalJob | ActivityKind::PollExternalJob => {}
            other => return Err(format!("activity {other:?} is not a webhook delivery")),
        }

        let execution = self
            .endpoints
            .get(input.step_key.as_str())
            .ok_or_else(|| format!("step '{}' has no registered endpoint", input.step_key))?;
        let webhook = webhook_request(execution, request)?;

        let context = RequestContext::new(
            input.tenant_id.clone(),
            input.run_id.clone(),
            input.step_key.clone(),
        );
        let response = self
            .client
            .send(&context, &webhook)
            .await
            .map_err(|e| e.to_string())?;
        tracing::debug!(
            step_key = %input.step_key,
            status = response.status,
            response_hash = %response.response_hash,
            "webhook activity delivered"
        );
        Ok(response.json().unwrap_or(Value::Null))
    }
}

/// Map a locked webhook descriptor plus one activity request onto an
/// outbound request. Pure, so header and idempotency behavior is
/// testable without a network.
pub fn webhook_request(
    execution: &StepExecution,
    request: &ActivityRequest,
) -> Result<WebhookRequest, String> {
    let StepExecution::ExternalWebhook {
        method,
        url_alias,
        token_alias,
        signing_alias,
        path,
        headers,
        ..
    } = execution
    else {
        return Err(format!(
            "descriptor mode '{}' cannot serve a webhook activity",
            execution.mode()
        ));
    };

    let mut webhook = WebhookRequest::new(*method, url_alias.clone(), path.clone())
        .with_body(request.payload.clone());
    for (name, value) in headers {
        webhook = webhook.with_header(name.clone(), value.clone());
    }
    if let Some(alias) = token_alias {
        webhook = webhook.with_token_alias(alias.clone());
    }
    if let Some(alias) = signing_alias {
        webhook = webhook.with_signing_alias(alias.clone());
    }
    if let Some(suffix) = &request.idempotency_suffix {
        webhook = webhook.with_idempotency_suffix(suffix.clone());
    }
    Ok(webhook)
}
