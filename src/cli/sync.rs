//! Sync command - one-shot rebuild of membership sets

use anyhow::Context;
use clap::Args;
use tracing::{error, info};

use crate::config::{AppConfig, CacheSettings};
use crate::domain::TenantId;
use crate::infrastructure::cache::CacheType;
use crate::infrastructure::observability::init_tracing;

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Only sync this tenant; all tenants when omitted
    #[arg(long)]
    pub tenant: Option<String>,
}

pub async fn run(args: SyncArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.logging, &config.observability.tracing);
    ensure_shared_cache(&config.cache)?;

    let state = crate::create_app_state_with_config(&config).await?;

    let result = match args.tenant {
        Some(tenant) => {
            let tenant_id = TenantId::new(tenant)?;
            let report = state.sync.sync_tenant(&tenant_id).await?;
            info!(tenant_id = %report.tenant_id, entries = report.entries, "Sync complete");
            Ok(())
        }
        None => {
            let report = state.sync.sync_all().await?;
            for failure in &report.failed {
                error!(tenant_id = %failure.tenant_id, error = %failure.error, "Tenant sync failed");
            }
            info!(
                synced = report.synced.len(),
                failed = report.failed.len(),
                "Sync complete"
            );

            if report.is_success() {
                Ok(())
            } else {
                Err(anyhow::anyhow!("{} tenant(s) failed to sync", report.failed.len()))
            }
        }
    };

    state.service.dispatcher().shutdown().await;
    result
}

/// A one-shot sync into a process-local cache is lost when the command exits
fn ensure_shared_cache(cache: &CacheSettings) -> anyhow::Result<()> {
    let cache_type: CacheType = cache.cache_type.parse()?;
    if cache_type != CacheType::Redis {
        anyhow::bail!(
            "the sync command needs cache.cache_type = \"redis\"; the {} cache lives only inside this process (use the admin sync route of a running gateway instead)",
            cache_type
        );
    }
    Ok(())
}
