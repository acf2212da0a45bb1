use std::time::Duration;

use serde::Deserialize;

use crate::infrastructure::cache::CacheType;
use crate::infrastructure::gateway::RateLimitAlgorithm;
use crate::infrastructure::observability::ObservabilityConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub observability: ObservabilityConfig,
    pub storage: StorageSettings,
    pub cache: CacheSettings,
    pub gateway: GatewaySettings,
    pub admin: AdminSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    InMemory,
    Postgres,
}

/// Canonical store settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// JSON file with credentials and entries loaded at start-up; PostgreSQL
    /// upserts credentials and keeps entries that already exist
    pub seed_path: Option<String>,
}

/// Shared cache settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub cache_type: String,
    pub redis_url: Option<String>,
    pub key_prefix: String,
    /// In-memory only: live nonce/counter entries before checks fail closed
    pub max_capacity: u64,
    pub operation_timeout_ms: u64,
    /// TTL of resolved credentials in front of the PostgreSQL directory
    pub credential_ttl_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    pub auth: AuthSettings,
    pub rate_limit: RateLimitSettings,
    pub check: CheckSettings,
    pub sampling: SamplingSettings,
    pub dispatcher: DispatcherSettings,
    pub stats: StatsSettings,
    pub sync: SyncSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub tolerance_secs: u64,
    pub nonce_max_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub window_secs: u64,
    pub algorithm: RateLimitAlgorithm,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CheckSettings {
    pub hash_length: usize,
    pub max_batch_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplingSettings {
    pub sample_rate: f64,
    pub auth_latency_threshold_ms: u64,
    pub slow_request_threshold_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatcherSettings {
    pub workers: usize,
    pub queue_capacity: usize,
    /// Upper bound on draining the queue at shutdown
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StatsSettings {
    pub minute_buckets: usize,
    pub hour_retention: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub on_startup: bool,
    pub batch_size: usize,
}

/// Admin surface; disabled when no token is configured
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AdminSettings {
    pub token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_url: None,
            max_connections: 10,
            seed_path: None,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            cache_type: CacheType::InMemory.to_string(),
            redis_url: None,
            key_prefix: "bl".to_string(),
            max_capacity: 1_000_000,
            operation_timeout_ms: 3_000,
            credential_ttl_secs: 30,
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            tolerance_secs: 300,
            nonce_max_length: 128,
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            window_secs: 60,
            algorithm: RateLimitAlgorithm::FixedWindow,
        }
    }
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            hash_length: 32,
            max_batch_size: 100,
        }
    }
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            sample_rate: 0.01,
            auth_latency_threshold_ms: 50,
            slow_request_threshold_ms: 100,
        }
    }
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 10_000,
            shutdown_timeout_secs: 10,
        }
    }
}

impl Default for StatsSettings {
    fn default() -> Self {
        Self {
            minute_buckets: 60,
            hour_retention: 168,
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            on_startup: true,
            batch_size: 1_000,
        }
    }
}

impl CacheSettings {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms.max(1))
    }
}

impl AppConfig {
    /// Load `config/default`, then `config/local`, then `APP__*` environment variables
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::builder()
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    fn builder() -> config::ConfigBuilder<config::builder::DefaultState> {
        config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
    }

    /// Parse a TOML document on top of the defaults
    pub fn from_toml(toml: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.backend, StorageBackend::InMemory);
        assert_eq!(config.cache.key_prefix, "bl");
        assert_eq!(config.cache.operation_timeout(), Duration::from_secs(3));
        assert_eq!(config.gateway.auth.tolerance_secs, 300);
        assert_eq!(config.gateway.rate_limit.algorithm, RateLimitAlgorithm::FixedWindow);
        assert_eq!(config.gateway.check.max_batch_size, 100);
        assert_eq!(config.gateway.sampling.sample_rate, 0.01);
        assert_eq!(config.gateway.stats.hour_retention, 168);
        assert!(config.gateway.sync.on_startup);
        assert!(config.admin.token.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [storage]
            backend = "postgres"
            database_url = "postgres://localhost/bl"

            [gateway.rate_limit]
            algorithm = "sliding_window"

            [gateway.sampling]
            sample_rate = 0.5

            [admin]
            token = "s3cret"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.backend, StorageBackend::Postgres);
        assert_eq!(config.gateway.rate_limit.algorithm, RateLimitAlgorithm::SlidingWindow);
        assert_eq!(config.gateway.rate_limit.window_secs, 60);
        assert_eq!(config.gateway.sampling.sample_rate, 0.5);
        assert_eq!(config.gateway.sampling.slow_request_threshold_ms, 100);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.admin.token.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_unknown_algorithm_is_rejected() {
        let result = AppConfig::from_toml(
            r#"
            [gateway.rate_limit]
            algorithm = "token_bucket"
            "#,
        );
        assert!(result.is_err());
    }
}
