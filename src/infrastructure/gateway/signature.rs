//! Request signing scheme
//!
//! The signature is HMAC-SHA256, keyed with the credential secret, over
//!
//! ```text
//! METHOD \n PATH \n TIMESTAMP \n NONCE \n BODY
//! ```
//!
//! encoded as lowercase hex. The method is upper-cased and the body is the
//! raw request bytes.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::domain::DomainError;

type HmacSha256 = Hmac<Sha256>;

/// The parts of a request covered by the signature
#[derive(Debug, Clone, Copy)]
pub struct SigningInput<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub timestamp: &'a str,
    pub nonce: &'a str,
    pub body: &'a [u8],
}

impl SigningInput<'_> {
    fn feed(&self, mac: &mut HmacSha256) {
        mac.update(self.method.to_ascii_uppercase().as_bytes());
        mac.update(b"\n");
        mac.update(self.path.as_bytes());
        mac.update(b"\n");
        mac.update(self.timestamp.as_bytes());
        mac.update(b"\n");
        mac.update(self.nonce.as_bytes());
        mac.update(b"\n");
        mac.update(self.body);
    }
}

fn keyed(secret: &str) -> Result<HmacSha256, DomainError> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| DomainError::internal(format!("Invalid HMAC key: {}", e)))
}

/// Computes the hex signature a client must send
pub fn sign(secret: &str, input: &SigningInput<'_>) -> Result<String, DomainError> {
    let mut mac = keyed(secret)?;
    input.feed(&mut mac);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verifies a hex signature in constant time
///
/// Signatures that are not valid hex never match.
pub fn verify(secret: &str, input: &SigningInput<'_>, signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex.trim()) else {
        return false;
    };

    let Ok(mut mac) = keyed(secret) else {
        return false;
    };

    input.feed(&mut mac);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef";

    fn input(body: &[u8]) -> SigningInput<'_> {
        SigningInput {
            method: "POST",
            path: "/blacklist/check",
            timestamp: "1714564800",
            nonce: "n-1",
            body,
        }
    }

    #[test]
    fn test_sign_matches_manual_hmac() {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(b"POST\n/blacklist/check\n1714564800\nn-1\n{}");
        let expected = hex::encode(mac.finalize().into_bytes());

        assert_eq!(sign(SECRET, &input(b"{}")).unwrap(), expected);
        assert_eq!(expected.len(), 64);
    }

    #[test]
    fn test_verify_round_trip() {
        let signature = sign(SECRET, &input(b"{\"hash_value\":\"ab\"}")).unwrap();
        assert!(verify(SECRET, &input(b"{\"hash_value\":\"ab\"}"), &signature));
        assert!(verify(
            SECRET,
            &input(b"{\"hash_value\":\"ab\"}"),
            &signature.to_uppercase()
        ));
    }

    #[test]
    fn test_verify_rejects_tampering() {
        let signature = sign(SECRET, &input(b"{}")).unwrap();

        assert!(!verify(SECRET, &input(b"{ }"), &signature));
        assert!(!verify("another-secret-value", &input(b"{}"), &signature));

        let mut other_path = input(b"{}");
        other_path.path = "/blacklist/check-batch";
        assert!(!verify(SECRET, &other_path, &signature));
    }

    #[test]
    fn test_verify_rejects_non_hex_and_truncated() {
        let signature = sign(SECRET, &input(b"{}")).unwrap();

        assert!(!verify(SECRET, &input(b"{}"), "not-hex"));
        assert!(!verify(SECRET, &input(b"{}"), &signature[..62]));
        assert!(!verify(SECRET, &input(b"{}"), ""));
    }

    #[test]
    fn test_method_case_is_normalized() {
        let mut lower = input(b"{}");
        lower.method = "post";
        assert_eq!(sign(SECRET, &lower).unwrap(), sign(SECRET, &input(b"{}")).unwrap());
    }
}
