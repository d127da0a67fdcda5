//! Webhook signature verification.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Verify a GitHub webhook signature using HMAC-SHA256.
///
/// # Arguments
/// * `body` - Raw webhook body bytes
/// * `signature` - `X-Hub-Signature-256` header value (`sha256=<hex>`)
/// * `secret` - Webhook signing secret
///
/// # Returns
/// `true` if signature is valid, `false` otherwise
#[must_use]
pub fn verify_webhook_signature(body: &[u8], signature: &str, secret: &str) -> bool {
    let Some(hex_signature) = signature.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(signature_bytes) = hex::decode(hex_signature) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let computed = mac.finalize().into_bytes();

    // Constant-time comparison to prevent timing attacks
    computed.as_slice().ct_eq(&signature_bytes).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(body: &[u8], secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn accepts_valid_signature() {
        let body = br#"{"action":"opened"}"#;
        let signature = sign(body, "s3cret");
        assert!(verify_webhook_signature(body, &signature, "s3cret"));
    }

    #[test]
    fn rejects_wrong_secret() {
        let body = br#"{"action":"opened"}"#;
        let signature = sign(body, "s3cret");
        assert!(!verify_webhook_signature(body, &signature, "other"));
    }

    #[test]
    fn rejects_tampered_body() {
        let signature = sign(br#"{"action":"opened"}"#, "s3cret");
        assert!(!verify_webhook_signature(
            br#"{"action":"edited"}"#,
            &signature,
            "s3cret"
        ));
    }

    #[test]
    fn rejects_missing_prefix_and_bad_hex() {
        let body = b"body";
        assert!(!verify_webhook_signature(body, "deadbeef", "s3cret"));
        assert!(!verify_webhook_signature(body, "sha256=zzzz", "s3cret"));
    }
}
