//! Admin authentication
//!
//! The admin routes accept a single static bearer token from configuration.
//! Without a configured token they answer 404.

use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;

/// Extractor that requires `Authorization: Bearer <admin token>`
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin;

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.admin_token.as_deref() else {
            return Err(ApiError::not_found("Admin API is disabled"));
        };

        let provided = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| {
                ApiError::unauthorized("Admin access requires a bearer token")
                    .with_code("missing_field")
            })?;

        if !tokens_match(provided, expected) {
            debug!("Admin token rejected");
            return Err(ApiError::forbidden("Invalid admin token").with_code("invalid_token"));
        }

        Ok(RequireAdmin)
    }
}

fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Compare digests so the comparison time does not depend on a common prefix
fn tokens_match(provided: &str, expected: &str) -> bool {
    Sha256::digest(provided.as_bytes()) == Sha256::digest(expected.as_bytes())
}
