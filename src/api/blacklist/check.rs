//! Check endpoint handlers

use axum::{
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::api::middleware::SignedCheck;
use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::clock::Clock;
use crate::domain::gateway::{GatewayError, RequestContext};
use crate::infrastructure::gateway::{
    Checked, RateLimitResult, BATCH_CHECK_ENDPOINT, CHECK_ENDPOINT,
};

const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// POST /blacklist/check
pub async fn check(State(state): State<AppState>, signed: SignedCheck) -> Response {
    let mut ctx = signed.context(CHECK_ENDPOINT, state.clock.now());
    let result = state.service.check(&mut ctx, &signed.request).await;
    respond(&state, &ctx, result)
}

/// POST /blacklist/check-batch
pub async fn check_batch(State(state): State<AppState>, signed: SignedCheck) -> Response {
    let mut ctx = signed.context(BATCH_CHECK_ENDPOINT, state.clock.now());
    let result = state.service.check_batch(&mut ctx, &signed.request).await;
    respond(&state, &ctx, result)
}

/// Render the result and hand statistics and audit work to the dispatcher
fn respond<T: Serialize>(
    state: &AppState,
    ctx: &RequestContext,
    result: Result<Checked<T>, GatewayError>,
) -> Response {
    match result {
        Ok(checked) => {
            let mut response = (StatusCode::OK, Json(checked.body)).into_response();
            insert_rate_limit_headers(response.headers_mut(), &checked.rate_limit);
            state
                .service
                .complete(ctx, StatusCode::OK.as_u16(), Some(checked.outcome), None);
            response
        }
        Err(error) => {
            let code = error.code();
            let error = ApiError::from(error);
            state
                .service
                .complete(ctx, error.status.as_u16(), None, Some(code));
            error.into_response()
        }
    }
}

fn insert_rate_limit_headers(headers: &mut HeaderMap, rate_limit: &RateLimitResult) {
    if rate_limit.is_unlimited() {
        return;
    }
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(rate_limit.limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(rate_limit.remaining));
    headers.insert(RATE_LIMIT_RESET, HeaderValue::from(rate_limit.reset_in_seconds));
}
