//! Extractor for signed blacklist requests
//!
//! Collects the authentication headers, the raw body (the signature covers
//! the exact bytes) and the client address. Whether the headers are valid is
//! left to the authenticator so every failure gets the same error taxonomy.

use std::net::{IpAddr, SocketAddr};

use axum::{
    body::Bytes,
    extract::{ConnectInfo, FromRequest, OriginalUri, Request},
    http::{request::Parts, HeaderMap},
};
use chrono::{DateTime, Utc};

use crate::api::types::ApiError;
use crate::domain::gateway::{RequestContext, SignedRequest};
use crate::infrastructure::gateway::authenticator::{
    API_KEY_HEADER, NONCE_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};

const REAL_IP_HEADER: &str = "x-real-ip";
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

#[derive(Debug)]
pub struct SignedCheck {
    pub request: SignedRequest,
    pub client_ip: Option<IpAddr>,
}

impl SignedCheck {
    pub fn context(&self, endpoint: &'static str, received_at: DateTime<Utc>) -> RequestContext {
        RequestContext::new(endpoint, received_at, self.client_ip)
    }
}

impl<S> FromRequest<S> for SignedCheck
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();

        let client_ip = client_ip(&parts);
        let path = parts
            .extensions
            .get::<OriginalUri>()
            .map(|uri| uri.path().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());
        let method = parts.method.as_str().to_string();
        let api_key = header_value(&parts.headers, API_KEY_HEADER);
        let timestamp = header_value(&parts.headers, TIMESTAMP_HEADER);
        let nonce = header_value(&parts.headers, NONCE_HEADER);
        let signature = header_value(&parts.headers, SIGNATURE_HEADER);

        let body = Bytes::from_request(Request::from_parts(parts, body), state)
            .await
            .map_err(|rejection| {
                ApiError::bad_request(format!(
                    "Failed to read request body: {}",
                    rejection.body_text()
                ))
                .with_code("invalid_body")
            })?;

        Ok(Self {
            request: SignedRequest {
                api_key,
                timestamp,
                nonce,
                signature,
                method,
                path,
                body,
            },
            client_ip,
        })
    }
}

/// Header value as text; non-UTF-8 bytes are replaced so a malformed value
/// still reaches the authenticator instead of looking absent
fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}

/// X-Real-IP, then the first X-Forwarded-For entry, then the peer address
fn client_ip(parts: &Parts) -> Option<IpAddr> {
    let forwarded = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
    };

    forwarded(REAL_IP_HEADER)
        .or_else(|| forwarded(FORWARDED_FOR_HEADER))
        .or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
}
