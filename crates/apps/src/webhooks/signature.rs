//! Webhook signature verification.
//!
//! The platform signs every webhook delivery with HMAC-SHA256 over
//! `"{timestamp}.{body}"` and sends the hex digest plus the timestamp in
//! headers. Verification happens against the raw body, before anything is
//! parsed, with a constant-time comparison and a replay window on the
//! timestamp.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Sha256, Sha512};
use thiserror::Error;

/// Maximum accepted clock difference for a webhook delivery.
const TIMESTAMP_WINDOW_SECS: i64 = 300;

/// Signature verification failures.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("request timestamp too old")]
    StaleTimestamp,
    #[error("signature mismatch")]
    Mismatch,
    #[error("bad signing key: {0}")]
    BadKey(String),
}

/// Constant-time string comparison for signatures.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Verify a platform webhook signature.
///
/// # Arguments
///
/// * `secret` - the shared webhook secret
/// * `timestamp` - the `x-platform-timestamp` header value
/// * `body` - the raw request body
/// * `signature` - the `x-platform-signature` header value (hex)
///
/// # Errors
///
/// Returns an error when the timestamp is unparseable or outside the replay
/// window, or when the signature does not match.
pub fn verify_platform_signature(
    secret: &SecretString,
    timestamp: &str,
    body: &str,
    signature: &str,
) -> Result<(), SignatureError> {
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| SignatureError::InvalidTimestamp(timestamp.to_owned()))?;

    let now = chrono::Utc::now().timestamp();
    if (now - ts).abs() > TIMESTAMP_WINDOW_SECS {
        return Err(SignatureError::StaleTimestamp);
    }

    let basestring = format!("{timestamp}.{body}");

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|e| SignatureError::BadKey(e.to_string()))?;
    mac.update(basestring.as_bytes());

    let expected = hex::encode(mac.finalize().into_bytes());

    if !constant_time_compare(&expected, signature) {
        return Err(SignatureError::Mismatch);
    }

    Ok(())
}

/// Verify an Authorize.net webhook signature.
///
/// Authorize.net signs the raw body with HMAC-SHA512 and sends the digest as
/// `X-ANET-Signature: sha512=<HEX>` (uppercase hex, no timestamp).
///
/// # Errors
///
/// Returns an error when the header is malformed or the digest does not
/// match.
pub fn verify_authorize_net_signature(
    signature_key: &SecretString,
    body: &str,
    header_value: &str,
) -> Result<(), SignatureError> {
    let digest = header_value
        .strip_prefix("sha512=")
        .ok_or(SignatureError::Mismatch)?;

    let mut mac = Hmac::<Sha512>::new_from_slice(signature_key.expose_secret().as_bytes())
        .map_err(|e| SignatureError::BadKey(e.to_string()))?;
    mac.update(body.as_bytes());

    let expected = hex::encode_upper(mac.finalize().into_bytes());

    if !constant_time_compare(&expected, &digest.to_uppercase()) {
        return Err(SignatureError::Mismatch);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> SecretString {
        SecretString::from("webhook-signing-key")
    }

    fn sign(timestamp: &str, body: &str) -> String {
        let mut mac =
            Hmac::<Sha256>::new_from_slice(b"webhook-signing-key").expect("key length is fine");
        mac.update(format!("{timestamp}.{body}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_platform_signature_accepts_valid() {
        let body = r#"{"event":"ORDER_CREATED"}"#;
        let ts = chrono::Utc::now().timestamp().to_string();
        let signature = sign(&ts, body);

        assert!(verify_platform_signature(&secret(), &ts, body, &signature).is_ok());
    }

    #[test]
    fn test_platform_signature_rejects_tampered_body() {
        let ts = chrono::Utc::now().timestamp().to_string();
        let signature = sign(&ts, r#"{"event":"ORDER_CREATED"}"#);

        assert!(matches!(
            verify_platform_signature(&secret(), &ts, r#"{"event":"ORDER_PAID"}"#, &signature),
            Err(SignatureError::Mismatch)
        ));
    }

    #[test]
    fn test_platform_signature_rejects_stale_timestamp() {
        let body = "{}";
        let stale = (chrono::Utc::now().timestamp() - 3600).to_string();
        let signature = sign(&stale, body);

        assert!(matches!(
            verify_platform_signature(&secret(), &stale, body, &signature),
            Err(SignatureError::StaleTimestamp)
        ));
    }

    #[test]
    fn test_platform_signature_rejects_bad_timestamp() {
        assert!(matches!(
            verify_platform_signature(&secret(), "not-a-number", "{}", "aa"),
            Err(SignatureError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_authorize_net_signature_roundtrip() {
        let key = SecretString::from("anet-signature-key");
        let body = r#"{"eventType":"net.authorize.payment.authcapture.created"}"#;

        let mut mac =
            Hmac::<Sha512>::new_from_slice(b"anet-signature-key").expect("key length is fine");
        mac.update(body.as_bytes());
        let header = format!("sha512={}", hex::encode_upper(mac.finalize().into_bytes()));

        assert!(verify_authorize_net_signature(&key, body, &header).is_ok());
        assert!(verify_authorize_net_signature(&key, "{}", &header).is_err());
        assert!(verify_authorize_net_signature(&key, body, "no-prefix").is_err());
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("deadbeef", "deadbeef"));
        assert!(!constant_time_compare("deadbeef", "deadbeee"));
        assert!(!constant_time_compare("dead", "deadbeef"));
    }
}
