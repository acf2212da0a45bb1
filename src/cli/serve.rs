//! Serve command - runs the HTTP server

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::timeout::TimeoutLayer;
use tracing::{error, info, warn};

use crate::api::{create_router, with_metrics, AppState};
use crate::config::AppConfig;
use crate::infrastructure::observability::{init_metrics, init_tracing, shutdown_tracing};

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    config.observability.metrics.validate()?;
    init_tracing(&config.logging, &config.observability.tracing);

    let state = crate::create_app_state_with_config(&config).await?;
    if config.gateway.sync.on_startup {
        startup_sync(&state).await;
    }

    let metrics = init_metrics(&config.observability.metrics);
    let app = with_metrics(
        create_router(state.clone()),
        metrics,
        &config.observability.metrics.path,
    )
    .layer(TimeoutLayer::new(Duration::from_secs(
        config.server.request_timeout_secs,
    )));

    let addr = build_socket_addr(&config)?;
    info!("Starting blacklist gateway on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    drain_background_jobs(&state, &config).await;
    shutdown_tracing();
    info!("Server shutdown complete");

    Ok(())
}

/// A tenant that fails to sync keeps serving from whatever set it already has
async fn startup_sync(state: &AppState) {
    match state.sync.sync_all().await {
        Ok(report) => {
            for failure in &report.failed {
                warn!(tenant_id = %failure.tenant_id, error = %failure.error, "Startup sync failed for tenant");
            }
            info!(
                synced = report.synced.len(),
                failed = report.failed.len(),
                "Startup cache sync finished"
            );
        }
        Err(e) => error!(error = %e, "Startup cache sync failed"),
    }
}

async fn drain_background_jobs(state: &AppState, config: &AppConfig) {
    let timeout = Duration::from_secs(config.gateway.dispatcher.shutdown_timeout_secs);

    if tokio::time::timeout(timeout, state.service.dispatcher().shutdown())
        .await
        .is_err()
    {
        warn!(
            timeout_secs = timeout.as_secs(),
            "Background queue not drained before timeout"
        );
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

fn build_socket_addr(config: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_socket_addr() {
        let mut config = AppConfig::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 9090;

        assert_eq!(
            build_socket_addr(&config).unwrap(),
            "127.0.0.1:9090".parse::<SocketAddr>().unwrap()
        );

        config.server.host = "not-an-ip".to_string();
        assert!(build_socket_addr(&config).is_err());
    }
}
