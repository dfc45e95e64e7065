//! Webhook signature verification (HMAC-SHA256 over the raw body).

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

use crate::error::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying `sha256=<hex digest>`.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Checks `header` against the HMAC-SHA256 of `body` keyed with `secret`.
///
/// The comparison runs in constant time. Every failure is reported before the
/// payload is parsed, so an unauthenticated event never touches the cache.
pub fn verify_signature(
    secret: Option<&str>,
    body: &[u8],
    header: Option<&str>,
) -> Result<(), WebhookError> {
    let secret = secret.ok_or(WebhookError::MissingSecret)?;
    let header = header
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or(WebhookError::MissingSignature)?;

    let signature_hex = header.strip_prefix("sha256=").unwrap_or(header);
    let expected = hex::decode(signature_hex).map_err(|_| {
        warn!("webhook signature is not valid hex");
        WebhookError::InvalidSignature
    })?;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(body);
    mac.verify_slice(&expected).map_err(|_| {
        warn!("webhook signature mismatch");
        WebhookError::InvalidSignature
    })
}

/// Produces the `sha256=<hex>` header value for `body`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
