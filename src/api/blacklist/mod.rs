//! Signed blacklist lookup endpoints

pub mod check;

use axum::{routing::post, Router};

use super::state::AppState;

pub fn create_blacklist_router() -> Router<AppState> {
    Router::new()
        .route("/check", post(check::check))
        .route("/check-batch", post(check::check_batch))
}
