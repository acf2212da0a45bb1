//! Cache sync endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::api::middleware::RequireAdmin;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json as JsonBody};
use crate::domain::gateway::{GatewayError, ValidationKind};
use crate::domain::TenantId;
use crate::infrastructure::gateway::{SyncAllReport, SyncReport};

/// Hashes for an incremental refresh of one tenant's live set
#[derive(Debug, Deserialize)]
pub struct EntriesRequest {
    pub hash_value_list: Vec<String>,
}

/// POST /admin/blacklist/sync/{tenant_id}
pub async fn sync_tenant(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(tenant_id): Path<String>,
) -> Result<Json<SyncReport>, ApiError> {
    let tenant_id = TenantId::new(tenant_id)?;
    info!(tenant_id = %tenant_id, "Admin-triggered cache sync");

    Ok(Json(state.sync.sync_tenant(&tenant_id).await?))
}

/// POST /admin/blacklist/sync
///
/// Per-tenant failures are part of the report; only failing to list the
/// tenants is an error.
pub async fn sync_all(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<SyncAllReport>, ApiError> {
    info!("Admin-triggered cache sync of all tenants");

    Ok(Json(state.sync.sync_all().await?))
}

/// POST /admin/blacklist/sync/{tenant_id}/entries
///
/// Adds hashes to the live set without a rebuild, e.g. right after a bulk
/// import. The store is not touched; the next full sync stays authoritative.
pub async fn add_entries(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(tenant_id): Path<String>,
    JsonBody(body): JsonBody<EntriesRequest>,
) -> Result<Json<SyncReport>, ApiError> {
    let tenant_id = TenantId::new(tenant_id)?;
    let hashes = normalized(&state, &body)?;
    info!(tenant_id = %tenant_id, hashes = hashes.len(), "Admin-triggered incremental cache add");

    Ok(Json(state.sync.add_entries(&tenant_id, &hashes).await?))
}

/// DELETE /admin/blacklist/sync/{tenant_id}/entries
pub async fn remove_entries(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(tenant_id): Path<String>,
    JsonBody(body): JsonBody<EntriesRequest>,
) -> Result<Json<SyncReport>, ApiError> {
    let tenant_id = TenantId::new(tenant_id)?;
    let hashes = normalized(&state, &body)?;
    info!(tenant_id = %tenant_id, hashes = hashes.len(), "Admin-triggered incremental cache removal");

    Ok(Json(state.sync.remove_entries(&tenant_id, &hashes).await?))
}

fn normalized(state: &AppState, body: &EntriesRequest) -> Result<Vec<String>, GatewayError> {
    if body.hash_value_list.is_empty() {
        return Err(GatewayError::validation(
            ValidationKind::BatchSize,
            "hash_value_list must not be empty",
        ));
    }
    state.service.normalize_hashes(&body.hash_value_list)
}
