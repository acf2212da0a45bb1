//! Blacklist verification gateway
//!
//! Answers signed machine-to-machine questions of the form "is this hashed
//! subject on my tenant's denylist?":
//! - HMAC-SHA256 request signatures with timestamp freshness and nonce replay protection
//! - Per-credential IP allow-lists and rate limits
//! - Per-tenant membership sets projected from the canonical store into a shared cache
//! - Minute and hour statistics plus sampled audit logging off the response path

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use api::state::AppState;
use config::{CacheSettings, StorageBackend};
use domain::{Cache, CacheKeys, CredentialDirectory, DenylistRepository, SharedClock};
use infrastructure::{
    cache::{CacheConfig, CacheFactory, CacheType},
    credential::{
        CachedCredentialDirectory, InMemoryCredentialDirectory, PostgresCredentialDirectory,
    },
    denylist::{InMemoryDenylistRepository, PostgresDenylistRepository},
    gateway::{
        AuditSink, AuthConfig, BackgroundDispatcher, BlacklistService, CacheSyncEngine,
        CheckConfig, DispatcherConfig, JobContext, MembershipCache, MetricsAggregator,
        PostgresAuditSink, RateLimiter, SamplingConfig, SamplingPolicy, SignatureAuthenticator,
        StatsConfig, TracingAuditSink,
    },
    storage::{connect_pool, run_gateway_migrations, PostgresConfig, SeedData},
};

/// Canonical stores and the audit sink chosen by the storage backend
#[derive(Debug, Clone)]
pub struct Stores {
    pub directory: Arc<dyn CredentialDirectory>,
    pub repository: Arc<dyn DenylistRepository>,
    pub audit: Arc<dyn AuditSink>,
}

/// Create the application state from configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let stores = create_stores(config).await?;
    let cache = create_cache(&config.cache).await?;

    Ok(build_app_state(config, stores, cache, domain::system_clock()))
}

/// Connect the configured storage backend
///
/// PostgreSQL runs the schema migrations, upserts the optional seed file and
/// puts a short-lived credential cache in front of the directory. The
/// in-memory backend is filled from the same seed file.
pub async fn create_stores(config: &AppConfig) -> anyhow::Result<Stores> {
    match config.storage.backend {
        StorageBackend::Postgres => {
            let url = config
                .storage
                .database_url
                .clone()
                .or_else(|| std::env::var("DATABASE_URL").ok())
                .context("storage.database_url or DATABASE_URL is required for the postgres backend")?;

            let pool = connect_pool(
                &PostgresConfig::new(url).with_max_connections(config.storage.max_connections),
            )
            .await?;
            let applied = run_gateway_migrations(&pool).await?;
            info!(applied, "Using PostgreSQL storage");

            let credentials = PostgresCredentialDirectory::new(pool.clone());
            let repository = PostgresDenylistRepository::new(pool.clone());
            if let Some(path) = &config.storage.seed_path {
                let seed = SeedData::load(path, config.gateway.check.hash_length).await?;
                for credential in &seed.credentials {
                    credentials.upsert(credential).await?;
                }
                let created = seed.insert_entries(&repository).await?;
                info!(
                    credentials = seed.credentials.len(),
                    entries = created,
                    "Seeded PostgreSQL storage"
                );
            }

            let directory = CachedCredentialDirectory::new(
                credentials,
                Duration::from_secs(config.cache.credential_ttl_secs),
            );

            Ok(Stores {
                directory: Arc::new(directory),
                repository: Arc::new(repository),
                audit: Arc::new(PostgresAuditSink::new(pool)),
            })
        }
        StorageBackend::InMemory => {
            let seed = match &config.storage.seed_path {
                Some(path) => SeedData::load(path, config.gateway.check.hash_length).await?,
                None => SeedData::default(),
            };
            info!(
                credentials = seed.credentials.len(),
                entries = seed.entries.len(),
                "Using in-memory storage"
            );

            Ok(Stores {
                directory: Arc::new(InMemoryCredentialDirectory::with_credentials(
                    seed.credentials,
                )),
                repository: Arc::new(InMemoryDenylistRepository::with_entries(seed.entries)),
                audit: Arc::new(TracingAuditSink),
            })
        }
    }
}

pub async fn create_cache(settings: &CacheSettings) -> anyhow::Result<Arc<dyn Cache>> {
    let cache_type: CacheType = settings.cache_type.parse()?;
    info!(cache_type = %cache_type, "Creating cache");

    let config = CacheConfig {
        cache_type,
        redis_url: settings.redis_url.clone(),
        max_capacity: settings.max_capacity,
    };

    Ok(CacheFactory::new().create(&config).await?)
}

/// Wire the gateway components; starts the background dispatcher
pub fn build_app_state(
    config: &AppConfig,
    stores: Stores,
    cache: Arc<dyn Cache>,
    clock: SharedClock,
) -> AppState {
    let gateway = &config.gateway;
    let keys = CacheKeys::new(config.cache.key_prefix.clone());
    let operation_timeout = config.cache.operation_timeout();

    let aggregator = Arc::new(MetricsAggregator::new(
        cache.clone(),
        keys.clone(),
        clock.clone(),
        StatsConfig {
            minute_buckets: gateway.stats.minute_buckets,
            hour_retention: gateway.stats.hour_retention,
        },
    ));

    let dispatcher = BackgroundDispatcher::start(
        JobContext {
            aggregator: aggregator.clone(),
            audit: stores.audit,
            directory: stores.directory.clone(),
        },
        DispatcherConfig {
            workers: gateway.dispatcher.workers,
            queue_capacity: gateway.dispatcher.queue_capacity,
        },
    );

    let authenticator = SignatureAuthenticator::new(
        stores.directory.clone(),
        cache.clone(),
        keys.clone(),
        clock.clone(),
        AuthConfig {
            tolerance: Duration::from_secs(gateway.auth.tolerance_secs),
            nonce_max_length: gateway.auth.nonce_max_length,
            operation_timeout,
        },
    );

    let rate_limiter = RateLimiter::new(
        cache.clone(),
        keys.clone(),
        clock.clone(),
        Duration::from_secs(gateway.rate_limit.window_secs.max(1)),
        gateway.rate_limit.algorithm,
    );

    let sampling = SamplingPolicy::new(SamplingConfig {
        sample_rate: gateway.sampling.sample_rate,
        auth_latency_threshold: Duration::from_millis(gateway.sampling.auth_latency_threshold_ms),
        slow_request_threshold: Duration::from_millis(gateway.sampling.slow_request_threshold_ms),
    });
    info!(sample_rate = sampling.sample_rate(), "Audit log sampling configured");

    let service = BlacklistService::new(
        authenticator,
        rate_limiter,
        MembershipCache::new(cache.clone(), keys.clone(), operation_timeout),
        sampling,
        dispatcher,
        clock.clone(),
        CheckConfig {
            hash_length: gateway.check.hash_length,
            max_batch_size: gateway.check.max_batch_size,
            operation_timeout,
        },
    );

    let sync = CacheSyncEngine::new(
        stores.repository.clone(),
        cache.clone(),
        keys,
        gateway.sync.batch_size,
    );

    AppState {
        service: Arc::new(service),
        sync: Arc::new(sync),
        aggregator,
        cache,
        directory: stores.directory,
        repository: stores.repository,
        clock,
        admin_token: config
            .admin
            .token
            .as_deref()
            .filter(|token| !token.is_empty())
            .map(Arc::from),
    }
}
