//! Request/response logging middleware with sensitive header redaction

use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::info;

/// Log every request and its completion.
///
/// Does not open its own span; `TraceLayer` already does and nesting
/// duplicate spans here breaks the registry.
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = extract_path(&request);
    let request_id = extract_request_id(&request);
    let headers_log = redact_headers(&request);

    info!(
        method = %method,
        path = %path,
        request_id = %request_id,
        headers = %headers_log,
        "Incoming request"
    );

    let response = next.run(request).await;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        request_id = %request_id,
        "Request completed"
    );

    response
}

fn extract_path(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}

fn extract_request_id(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

fn redact_headers(request: &Request<Body>) -> String {
    let mut parts = Vec::new();

    for (name, value) in request.headers() {
        let name = name.as_str();
        if !should_log_header(name) {
            continue;
        }
        let value = if is_sensitive_header(name) {
            "[REDACTED]"
        } else {
            value.to_str().unwrap_or("[invalid]")
        };
        parts.push(format!("{}={}", name, value));
    }

    parts.join(", ")
}

/// Headers carrying credentials or signing material
fn is_sensitive_header(name: &str) -> bool {
    matches!(
        name,
        "authorization"
            | "proxy-authorization"
            | "cookie"
            | "x-api-key"
            | "x-signature"
            | "x-nonce"
    )
}

fn should_log_header(name: &str) -> bool {
    matches!(
        name,
        "content-type"
            | "content-length"
            | "user-agent"
            | "x-request-id"
            | "x-forwarded-for"
            | "x-real-ip"
            | "x-timestamp"
            | "authorization"
            | "x-api-key"
            | "x-signature"
            | "x-nonce"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_sensitive_header() {
        assert!(is_sensitive_header("authorization"));
        assert!(is_sensitive_header("x-api-key"));
        assert!(is_sensitive_header("x-signature"));
        assert!(is_sensitive_header("x-nonce"));
        assert!(!is_sensitive_header("x-timestamp"));
        assert!(!is_sensitive_header("content-type"));
    }

    #[test]
    fn test_redact_headers() {
        let request = Request::builder()
            .header("content-type", "application/json")
            .header("x-api-key", "ak-1")
            .header("x-signature", "deadbeef")
            .header("x-nonce", "n-123")
            .header("x-timestamp", "1700000000")
            .header("etag", "abc")
            .body(Body::empty())
            .unwrap();

        let log = redact_headers(&request);
        assert!(log.contains("content-type=application/json"));
        assert!(log.contains("x-timestamp=1700000000"));
        assert!(log.contains("x-signature=[REDACTED]"));
        assert!(!log.contains("deadbeef"));
        assert!(!log.contains("n-123"));
        assert!(!log.contains("ak-1"));
        assert!(!log.contains("etag"));
    }

    #[test]
    fn test_request_id_is_propagated() {
        let request = Request::builder()
            .header("x-request-id", "req-42")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_request_id(&request), "req-42");
    }
}
