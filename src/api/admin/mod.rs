//! Admin endpoints for cache sync and tenant statistics

pub mod stats;
pub mod sync;

use axum::{
    routing::{get, post},
    Router,
};

use super::state::AppState;

pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        .route("/blacklist/sync", post(sync::sync_all))
        .route("/blacklist/sync/{tenant_id}", post(sync::sync_tenant))
        .route(
            "/blacklist/sync/{tenant_id}/entries",
            post(sync::add_entries).delete(sync::remove_entries),
        )
        .route("/blacklist/stats/{tenant_id}/hourly", get(stats::hourly_stats))
        .route("/blacklist/stats/{tenant_id}/minutes", get(stats::minute_stats))
}
