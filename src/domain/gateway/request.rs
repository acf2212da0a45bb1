//! Raw signed request as received from the transport

use bytes::Bytes;

/// Authentication material and payload of one signed request
///
/// Header values are kept as received; the authenticator decides whether
/// they are present and well formed.
#[derive(Clone, Default)]
pub struct SignedRequest {
    pub api_key: Option<String>,
    pub timestamp: Option<String>,
    pub nonce: Option<String>,
    pub signature: Option<String>,
    pub method: String,
    pub path: String,
    pub body: Bytes,
}

impl std::fmt::Debug for SignedRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedRequest")
            .field("api_key", &self.api_key)
            .field("timestamp", &self.timestamp)
            .field("signature", &self.signature.as_ref().map(|_| "[REDACTED]"))
            .field("method", &self.method)
            .field("path", &self.path)
            .field("body_len", &self.body.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_signature_and_nonce() {
        let request = SignedRequest {
            api_key: Some("ak-1".to_string()),
            nonce: Some("nonce-value-123".to_string()),
            signature: Some("deadbeefcafe".to_string()),
            ..Default::default()
        };

        let debug = format!("{:?}", request);
        assert!(!debug.contains("deadbeefcafe"));
        assert!(!debug.contains("nonce-value-123"));
        assert!(debug.contains("ak-1"));
    }
}
