//! Favro webhook signature checks.
//!
//! Favro signs `payloadId + webhook URL + "/calculator"` with the shared secret and
//! sends the base64 HMAC-SHA1 digest in `X-Favro-Webhook`. Both the expected and the
//! received signature are hashed once more with the same secret before comparing
//! (double HMAC).

use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;

type HmacSha1 = Hmac<Sha1>;

/// Path Favro is configured to deliver to, appended to the webhook base URL.
pub const CALCULATOR_PATH: &str = "/calculator";

pub struct WebhookVerifier {
    secret: Vec<u8>,
    webhook_url: String,
}

impl WebhookVerifier {
    pub fn new(secret: &str, webhook_url: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            webhook_url: webhook_url.to_string(),
        }
    }

    /// Returns true when `header` is the signature Favro computes for `payload_id`.
    ///
    /// A missing header should be passed as an empty string; it never matches.
    #[must_use]
    pub fn verify(&self, payload_id: &str, header: &str) -> bool {
        let expected = self
            .sign(payload_id)
            .and_then(|signature| self.digest(signature.as_bytes()));
        let received = self.digest(header.as_bytes());
        digests_match(expected.as_deref(), received.as_deref())
    }

    /// Signature Favro sends for `payload_id`.
    pub fn sign(&self, payload_id: &str) -> Option<String> {
        let content = format!("{payload_id}{}{CALCULATOR_PATH}", self.webhook_url);
        self.digest(content.as_bytes())
    }

    fn digest(&self, content: &[u8]) -> Option<String> {
        let Ok(mut mac) = HmacSha1::new_from_slice(&self.secret) else {
            return None;
        };
        mac.update(content);
        Some(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
    }
}

/// A digest that could not be computed never matches, not even another missing one.
fn digests_match(expected: Option<&str>, received: Option<&str>) -> bool {
    match (expected, received) {
        (Some(expected), Some(received)) => expected.as_bytes().ct_eq(received.as_bytes()).into(),
        _ => false,
    }
}
