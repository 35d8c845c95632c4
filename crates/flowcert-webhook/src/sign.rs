//! Idempotency keys and body signing

use crate::WebhookError;
use flowcert_types::{RunId, StepKey};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Deterministic delivery key for a step's outbound request:
/// `run:step`, or `run:step:suffix` when one logical step issues
/// several distinct requests (polling attempts, multi-part submits).
/// Retries of the same request reuse the same key, so the receiving
/// side can deduplicate.
pub fn idempotency_key(run_id: &RunId, step_key: &StepKey, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) => format!("{run_id}:{step_key}:{suffix}"),
        None => format!("{run_id}:{step_key}"),
    }
}

/// Hex HMAC-SHA256 over the exact serialized body bytes. The receiver
/// must verify against the bytes it read, not a re-serialization.
pub fn sign_body(signing_secret: &str, body: &[u8]) -> Result<String, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes())
        .map_err(|e| WebhookError::Signing(e.to_string()))?;
    mac.update(body);
    Ok(hex_encode(&mac.finalize().into_bytes()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idempotency_key_shape() {
        let run = RunId::new("run-1");
        let step = StepKey::new("notarization");
        assert_eq!(idempotency_key(&run, &step, None), "run-1:notarization");
        assert_eq!(
            idempotency_key(&run, &step, Some("poll-3")),
            "run-1:notarization:poll-3"
        );
    }

    #[test]
    fn test_signature_is_deterministic_hex() {
        let a = sign_body("signing-secret", br#"{"amount":25000}"#).unwrap();
        let b = sign_body("signing-secret", br#"{"amount":25000}"#).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_signature_depends_on_secret_and_body() {
        let base = sign_body("secret-a", b"payload").unwrap();
        assert_ne!(base, sign_body("secret-b", b"payload").unwrap());
        assert_ne!(base, sign_body("secret-a", b"payload2").unwrap());
    }
}
