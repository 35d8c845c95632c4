//! The transport layer
//!
//! Thin reqwest wrapper around [`build_parts`]: assembles the request,
//! performs it, hashes what crossed the wire, and classifies the
//! status. Everything interesting happens in request assembly; the
//! client stays dumb so tests never need a live endpoint.

use crate::request::{build_parts, RequestContext, WebhookRequest};
use crate::{WebhookError, WebhookResult};
use flowcert_secrets::SecretStore;
use flowcert_types::HttpMethod;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// What came back from the endpoint, with content hashes for the audit
/// trail. Persist the hashes, not the bodies.
#[derive(Clone, Debug)]
pub struct WebhookResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    /// SHA-256 hex of the request body bytes as sent
    pub request_hash: String,
    /// SHA-256 hex of the response body bytes as received
    pub response_hash: String,
}

impl WebhookResponse {
    /// Parse the response body as JSON, if it is JSON.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// HTTP client that signs and correlates every outbound request.
pub struct SignedHttpClient {
    http: reqwest::Client,
    secrets: Arc<SecretStore>,
}

impl SignedHttpClient {
    pub fn new(secrets: Arc<SecretStore>) -> WebhookResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { http, secrets })
    }

    /// Assemble, sign, and send a request. A non-2xx status is an
    /// error carrying the idempotency key and response hash so retries
    /// and audit records can reference the exact exchange.
    pub async fn send(
        &self,
        context: &RequestContext,
        request: &WebhookRequest,
    ) -> WebhookResult<WebhookResponse> {
        let parts = build_parts(context, request, &self.secrets)?;

        let request_hash = flowcert_hash::sha256_hex(
            parts.body.as_deref().unwrap_or("").as_bytes(),
        );

        let mut builder = self
            .http
            .request(to_reqwest_method(parts.method), parts.url.clone());
        for (name, value) in &parts.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &parts.body {
            builder = builder.body(body.clone());
        }

        tracing::debug!(
            method = %parts.method,
            idempotency_key = %parts.idempotency_key,
            "sending webhook request"
        );
        let response = builder.send().await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await?;
        let response_hash = flowcert_hash::sha256_hex(body.as_bytes());

        if !(200..300).contains(&status) {
            tracing::warn!(
                status,
                idempotency_key = %parts.idempotency_key,
                "webhook endpoint rejected request"
            );
            return Err(WebhookError::Status {
                status,
                idempotency_key: parts.idempotency_key,
                response_hash,
            });
        }

        Ok(WebhookResponse {
            status,
            headers,
            body,
            request_hash,
            response_hash,
        })
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}
