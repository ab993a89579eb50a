//! `X-VERIFY` request signatures for the v1 (Hermes) API.
//!
//! The scheme is a plain concatenation-and-hash rather than a standard HMAC:
//! `sha256(base64_payload + api_path + salt_key)` in lowercase hex, followed
//! by `###` and the salt index. It gives tamper evidence and proves
//! possession of the salt key, but carries no nonce or timestamp, so it does
//! not protect against replay. That matches the gateway's contract.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

pub(crate) const VERIFY_SEPARATOR: &str = "###";

/// Base64-encode a JSON payload the way the gateway expects it in the
/// `{"request": ...}` envelope.
pub fn encode_payload(payload_json: &str) -> String {
    STANDARD.encode(payload_json.as_bytes())
}

/// Signature for a request with a body: the signed string is
/// `base64_payload + api_path + salt_key`.
pub fn sign_payload(base64_payload: &str, api_path: &str, salt_key: &str, salt_index: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(base64_payload.as_bytes());
    hasher.update(api_path.as_bytes());
    hasher.update(salt_key.as_bytes());
    format!("{:x}{}{}", hasher.finalize(), VERIFY_SEPARATOR, salt_index)
}

/// Signature for a body-less GET: the signed string is `api_path + salt_key`,
/// where `api_path` already includes its path parameters.
pub fn sign_path(api_path: &str, salt_key: &str, salt_index: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_path.as_bytes());
    hasher.update(salt_key.as_bytes());
    format!("{:x}{}{}", hasher.finalize(), VERIFY_SEPARATOR, salt_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_deterministic() {
        let payload = encode_payload(r#"{"merchantId":"M1","amount":100}"#);
        let a = sign_payload(&payload, "/pg/v1/pay", "salt", 1);
        let b = sign_payload(&payload, "/pg/v1/pay", "salt", 1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_signature_format_is_hex_hash_and_index() {
        let sig = sign_payload("cGF5bG9hZA==", "/pg/v1/pay", "salt", 3);
        let (digest, index) = sig.split_once(VERIFY_SEPARATOR).unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(index, "3");
    }

    #[test]
    fn test_signature_changes_with_any_input() {
        let base = sign_payload("cGF5bG9hZA==", "/pg/v1/pay", "salt", 1);
        assert_ne!(base, sign_payload("b3RoZXI=", "/pg/v1/pay", "salt", 1));
        assert_ne!(base, sign_payload("cGF5bG9hZA==", "/pg/v1/refund", "salt", 1));
        assert_ne!(base, sign_payload("cGF5bG9hZA==", "/pg/v1/pay", "other", 1));
    }

    #[test]
    fn test_path_signature_matches_manual_digest() {
        let mut hasher = Sha256::new();
        hasher.update(b"/pg/v1/status/M1/TXN1");
        hasher.update(b"salt");
        let expected = format!("{:x}###2", hasher.finalize());
        assert_eq!(sign_path("/pg/v1/status/M1/TXN1", "salt", 2), expected);
    }
}
