//! Tenant statistics endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use crate::api::middleware::RequireAdmin;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Query};
use crate::domain::{HourlyStats, MinuteSeries, TenantId};

const DEFAULT_HOURS: u32 = 24;
const DEFAULT_MINUTES: u32 = 60;

#[derive(Debug, Deserialize)]
pub struct HourlyQuery {
    pub hours: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct MinuteQuery {
    pub minutes: Option<u32>,
}

/// GET /admin/blacklist/stats/{tenant_id}/hourly?hours=N
pub async fn hourly_stats(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(tenant_id): Path<String>,
    Query(query): Query<HourlyQuery>,
) -> Result<Json<HourlyStats>, ApiError> {
    let tenant_id = TenantId::new(tenant_id)?;
    let hours = query.hours.unwrap_or(DEFAULT_HOURS);

    Ok(Json(state.aggregator.hourly_stats(&tenant_id, hours).await?))
}

/// GET /admin/blacklist/stats/{tenant_id}/minutes?minutes=N
pub async fn minute_stats(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(tenant_id): Path<String>,
    Query(query): Query<MinuteQuery>,
) -> Result<Json<MinuteSeries>, ApiError> {
    let tenant_id = TenantId::new(tenant_id)?;
    let minutes = query.minutes.unwrap_or(DEFAULT_MINUTES);

    Ok(Json(state.aggregator.minute_stats(&tenant_id, minutes).await?))
}
