//! Signed, idempotent HTTP delivery for external step execution
//!
//! External webhook steps deliver a payload to a partner endpoint whose
//! URL and credentials are resolved from secret aliases at send time.
//! Every request carries a deterministic idempotency key derived from
//! the run and step, correlation headers, and (when a signing alias is
//! configured) an HMAC-SHA256 signature over the exact serialized body.
//! Request and response bodies are hashed so audit records can prove
//! what crossed the wire without persisting payloads.
//!
//! Request assembly is a pure function over the descriptor, the run
//! context, and the secret store; the reqwest client only performs the
//! already-built request.

pub mod client;
pub mod request;
pub mod sign;

pub use client::{SignedHttpClient, WebhookResponse};
pub use request::{build_parts, RequestContext, RequestParts, WebhookRequest};
pub use sign::{idempotency_key, sign_body};

use flowcert_secrets::SecretError;

/// Header carrying the deterministic delivery key.
pub const HEADER_IDEMPOTENCY_KEY: &str = "X-FC-Idempotency-Key";
/// Correlation header: originating run.
pub const HEADER_RUN_ID: &str = "X-FC-Run-Id";
/// Correlation header: originating step.
pub const HEADER_STEP_KEY: &str = "X-FC-Step-Key";
/// Hex HMAC-SHA256 of the request body.
pub const HEADER_SIGNATURE: &str = "X-FC-Signature";

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error("alias '{alias}' resolved to an unparseable base URL")]
    InvalidUrl {
        alias: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request body could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("endpoint returned status {status} for idempotency key '{idempotency_key}'")]
    Status {
        status: u16,
        idempotency_key: String,
        response_hash: String,
    },
}

pub type WebhookResult<T> = Result<T, WebhookError>;
