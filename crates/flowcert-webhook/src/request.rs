//! Request assembly
//!
//! `build_parts` turns an execution descriptor plus a run context into
//! a fully assembled request: resolved URL, correlation headers,
//! serialized body, idempotency key, and signature. It performs no I/O
//! beyond secret resolution, so the full header and signing behavior is
//! testable without a live endpoint.

use crate::sign::{idempotency_key, sign_body};
use crate::{
    WebhookError, WebhookResult, HEADER_IDEMPOTENCY_KEY, HEADER_RUN_ID, HEADER_SIGNATURE,
    HEADER_STEP_KEY,
};
use flowcert_secrets::SecretStore;
use flowcert_types::{HttpMethod, RunId, StepKey, TenantId};
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

/// The run a request is issued on behalf of. Flows into correlation
/// headers and the idempotency key, and scopes secret resolution.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub tenant_id: TenantId,
    pub run_id: RunId,
    pub step_key: StepKey,
}

impl RequestContext {
    pub fn new(tenant_id: TenantId, run_id: RunId, step_key: StepKey) -> Self {
        Self {
            tenant_id,
            run_id,
            step_key,
        }
    }
}

/// An outbound request described entirely through aliases. Built from a
/// step's execution descriptor; never carries a literal URL or secret.
#[derive(Clone, Debug)]
pub struct WebhookRequest {
    pub method: HttpMethod,
    pub url_alias: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    /// Static headers from the descriptor. Protocol headers win on
    /// collision.
    pub headers: BTreeMap<String, String>,
    pub token_alias: Option<String>,
    pub signing_alias: Option<String>,
    pub body: Option<Value>,
    /// Distinguishes multiple logical requests from one step, e.g.
    /// successive poll attempts.
    pub idempotency_suffix: Option<String>,
}

impl WebhookRequest {
    pub fn new(method: HttpMethod, url_alias: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method,
            url_alias: url_alias.into(),
            path: path.into(),
            query: Vec::new(),
            headers: BTreeMap::new(),
            token_alias: None,
            signing_alias: None,
            body: None,
            idempotency_suffix: None,
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_token_alias(mut self, alias: impl Into<String>) -> Self {
        self.token_alias = Some(alias.into());
        self
    }

    pub fn with_signing_alias(mut self, alias: impl Into<String>) -> Self {
        self.signing_alias = Some(alias.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_idempotency_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.idempotency_suffix = Some(suffix.into());
        self
    }
}

/// A fully assembled request, ready for transport.
#[derive(Clone, Debug)]
pub struct RequestParts {
    pub method: HttpMethod,
    pub url: Url,
    /// Headers in insertion order; protocol headers come last and
    /// override descriptor headers of the same name.
    pub headers: Vec<(String, String)>,
    /// Serialized body. The signature, if any, covers exactly these
    /// bytes.
    pub body: Option<String>,
    pub idempotency_key: String,
}

/// Assemble the request: resolve the base URL and credentials, fix the
/// body bytes, derive the idempotency key, and sign.
pub fn build_parts(
    context: &RequestContext,
    request: &WebhookRequest,
    secrets: &SecretStore,
) -> WebhookResult<RequestParts> {
    let base = secrets.resolve(&context.tenant_id, &request.url_alias)?;
    let mut url = join_url(&request.url_alias, &base, &request.path)?;
    if !request.query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &request.query {
            pairs.append_pair(key, value);
        }
    }

    let body = request
        .body
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let key = idempotency_key(
        &context.run_id,
        &context.step_key,
        request.idempotency_suffix.as_deref(),
    );

    let mut headers: Vec<(String, String)> = Vec::new();
    if body.is_some() {
        headers.push(("Content-Type".to_string(), "application/json".to_string()));
    }
    for (name, value) in &request.headers {
        headers.push((name.clone(), value.clone()));
    }
    headers.push((HEADER_IDEMPOTENCY_KEY.to_string(), key.clone()));
    headers.push((HEADER_RUN_ID.to_string(), context.run_id.to_string()));
    headers.push((HEADER_STEP_KEY.to_string(), context.step_key.to_string()));

    if let Some(alias) = &request.token_alias {
        let token = secrets.resolve(&context.tenant_id, alias)?;
        headers.push(("Authorization".to_string(), format!("Bearer {token}")));
    }

    if let Some(alias) = &request.signing_alias {
        let signing_secret = secrets.resolve(&context.tenant_id, alias)?;
        let payload = body.as_deref().unwrap_or("");
        let signature = sign_body(&signing_secret, payload.as_bytes())?;
        headers.push((HEADER_SIGNATURE.to_string(), signature));
    }

    Ok(RequestParts {
        method: request.method,
        url,
        headers,
        body,
        idempotency_key: key,
    })
}

fn join_url(alias: &str, base: &str, path: &str) -> WebhookResult<Url> {
    let base = base.trim_end_matches('/');
    let joined = if path.is_empty() {
        base.to_string()
    } else if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    };
    Url::parse(&joined).map_err(|source| WebhookError::InvalidUrl {
        alias: alias.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowcert_secrets::MapSecretProvider;
    use serde_json::json;

    fn make_secrets() -> SecretStore {
        SecretStore::new(
            MapSecretProvider::new()
                .with_secret(
                    "FC_SECRET_ACME_GMBH__NOTARY_ENDPOINT",
                    "https://api.notary.example.com/",
                )
                .with_secret("FC_SECRET_ACME_GMBH__NOTARY_TOKEN", "tok-123")
                .with_secret("FC_SECRET_ACME_GMBH__NOTARY_SIGNING", "sig-secret"),
        )
    }

    fn make_context() -> RequestContext {
        RequestContext::new(
            TenantId::new("acme-gmbh"),
            RunId::new("run-1"),
            StepKey::new("notarization"),
        )
    }

    fn header<'a>(parts: &'a RequestParts, name: &str) -> Option<&'a str> {
        parts
            .headers
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_correlation_and_idempotency_headers() {
        let request = WebhookRequest::new(HttpMethod::Post, "notary-endpoint", "/v1/jobs")
            .with_body(json!({"amount": 25000}));
        let parts = build_parts(&make_context(), &request, &make_secrets()).unwrap();

        assert_eq!(parts.idempotency_key, "run-1:notarization");
        assert_eq!(
            header(&parts, "X-FC-Idempotency-Key"),
            Some("run-1:notarization")
        );
        assert_eq!(header(&parts, "X-FC-Run-Id"), Some("run-1"));
        assert_eq!(header(&parts, "X-FC-Step-Key"), Some("notarization"));
        assert_eq!(header(&parts, "Content-Type"), Some("application/json"));
        assert_eq!(parts.url.as_str(), "https://api.notary.example.com/v1/jobs");
    }

    #[test]
    fn test_suffix_extends_idempotency_key() {
        let request = WebhookRequest::new(HttpMethod::Get, "notary-endpoint", "/v1/jobs/42")
            .with_idempotency_suffix("poll-2");
        let parts = build_parts(&make_context(), &request, &make_secrets()).unwrap();
        assert_eq!(parts.idempotency_key, "run-1:notarization:poll-2");
    }

    #[test]
    fn test_bearer_token_from_alias() {
        let request = WebhookRequest::new(HttpMethod::Post, "notary-endpoint", "/v1/jobs")
            .with_token_alias("notary-token");
        let parts = build_parts(&make_context(), &request, &make_secrets()).unwrap();
        assert_eq!(header(&parts, "Authorization"), Some("Bearer tok-123"));
    }

    #[test]
    fn test_signature_covers_exact_body_bytes() {
        let request = WebhookRequest::new(HttpMethod::Post, "notary-endpoint", "/v1/jobs")
            .with_signing_alias("notary-signing")
            .with_body(json!({"amount": 25000}));
        let parts = build_parts(&make_context(), &request, &make_secrets()).unwrap();

        let body = parts.body.as_deref().unwrap();
        let expected = sign_body("sig-secret", body.as_bytes()).unwrap();
        assert_eq!(header(&parts, "X-FC-Signature"), Some(expected.as_str()));
    }

    #[test]
    fn test_bodyless_request_signs_empty_payload() {
        let request = WebhookRequest::new(HttpMethod::Get, "notary-endpoint", "/v1/jobs/42")
            .with_signing_alias("notary-signing");
        let parts = build_parts(&make_context(), &request, &make_secrets()).unwrap();

        assert!(parts.body.is_none());
        assert!(header(&parts, "Content-Type").is_none());
        let expected = sign_body("sig-secret", b"").unwrap();
        assert_eq!(header(&parts, "X-FC-Signature"), Some(expected.as_str()));
    }

    #[test]
    fn test_query_parameters_appended() {
        let request = WebhookRequest::new(HttpMethod::Get, "notary-endpoint", "/v1/jobs")
            .with_query("state", "open")
            .with_query("page", "2");
        let parts = build_parts(&make_context(), &request, &make_secrets()).unwrap();
        assert_eq!(parts.url.query(), Some("state=open&page=2"));
    }

    #[test]
    fn test_descriptor_headers_carried() {
        let request = WebhookRequest::new(HttpMethod::Post, "notary-endpoint", "/v1/jobs")
            .with_header("X-Partner-Ref", "notar-42");
        let parts = build_parts(&make_context(), &request, &make_secrets()).unwrap();
        assert_eq!(header(&parts, "X-Partner-Ref"), Some("notar-42"));
    }

    #[test]
    fn test_unresolvable_url_alias_fails() {
        let request = WebhookRequest::new(HttpMethod::Post, "missing-endpoint", "/v1/jobs");
        let err = build_parts(&make_context(), &request, &make_secrets()).unwrap_err();
        assert!(matches!(err, WebhookError::Secret(_)));
    }

    #[test]
    fn test_garbage_base_url_names_the_alias() {
        let secrets = SecretStore::new(
            MapSecretProvider::new().with_secret("FC_SECRET__BAD_ENDPOINT", "not a url"),
        );
        let request = WebhookRequest::new(HttpMethod::Post, "bad-endpoint", "/v1/jobs");
        let err = build_parts(&make_context(), &request, &secrets).unwrap_err();
        match err {
            WebhookError::InvalidUrl { alias, .. } => assert_eq!(alias, "bad-endpoint"),
            other => panic!("expected InvalidUrl, got {other}"),
        }
    }
}
