//! Health check endpoints for Kubernetes probes

use std::future::Future;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::domain::DomainError;

use super::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<HealthCheck>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

#[derive(Serialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Returns 200 while the process is up
pub async fn health_check() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: None,
        latency_ms: None,
    };

    (StatusCode::OK, Json(response))
}

/// Readiness with dependency probes
///
/// Checks cannot be answered without the cache or the credential directory,
/// so either failing makes the instance unready. The denylist store only
/// feeds syncs; losing it degrades the instance but keeps it serving.
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();

    let (cache, directory, repository) = tokio::join!(
        probe("cache", HealthStatus::Unhealthy, state.cache.ping()),
        probe(
            "credential_directory",
            HealthStatus::Unhealthy,
            state.directory.ping()
        ),
        probe(
            "denylist_store",
            HealthStatus::Degraded,
            state.repository.ping()
        ),
    );
    let checks = vec![cache, directory, repository];
    let overall = overall_status(&checks);

    let response = HealthResponse {
        status: overall,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: Some(checks),
        latency_ms: Some(start.elapsed().as_millis() as u64),
    };

    let status_code = match overall {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response))
}

/// Liveness probe
pub async fn live_check() -> impl IntoResponse {
    StatusCode::OK
}

async fn probe(
    name: &str,
    on_failure: HealthStatus,
    ping: impl Future<Output = Result<(), DomainError>>,
) -> HealthCheck {
    let start = Instant::now();
    let result = ping.await;
    let latency_ms = Some(start.elapsed().as_millis() as u64);

    match result {
        Ok(()) => HealthCheck {
            name: name.to_string(),
            status: HealthStatus::Healthy,
            message: None,
            latency_ms,
        },
        Err(e) => {
            tracing::warn!(component = name, error = %e, "Readiness probe failed");
            HealthCheck {
                name: name.to_string(),
                status: on_failure,
                message: Some(e.to_string()),
                latency_ms,
            }
        }
    }
}

fn overall_status(checks: &[HealthCheck]) -> HealthStatus {
    if checks.iter().any(|c| c.status == HealthStatus::Unhealthy) {
        HealthStatus::Unhealthy
    } else if checks.iter().any(|c| c.status == HealthStatus::Degraded) {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(status: HealthStatus) -> HealthCheck {
        HealthCheck {
            name: "component".to_string(),
            status,
            message: None,
            latency_ms: None,
        }
    }

    #[test]
    fn test_health_status_serialization() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Degraded).unwrap(),
            "\"degraded\""
        );
    }

    #[test]
    fn test_overall_status() {
        assert_eq!(overall_status(&[check(HealthStatus::Healthy)]), HealthStatus::Healthy);
        assert_eq!(
            overall_status(&[check(HealthStatus::Healthy), check(HealthStatus::Degraded)]),
            HealthStatus::Degraded
        );
        assert_eq!(
            overall_status(&[check(HealthStatus::Degraded), check(HealthStatus::Unhealthy)]),
            HealthStatus::Unhealthy
        );
    }

    #[tokio::test]
    async fn test_probe_failure_uses_given_status() {
        let result = probe(
            "denylist_store",
            HealthStatus::Degraded,
            async { Err(DomainError::storage("connection refused")) },
        )
        .await;

        assert_eq!(result.status, HealthStatus::Degraded);
        assert_eq!(
            result.message.as_deref(),
            Some("Storage error: connection refused")
        );
    }
}
