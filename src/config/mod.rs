//! Layered application settings

mod app_config;

pub use app_config::{
    AdminSettings, AppConfig, AuthSettings, CacheSettings, CheckSettings, DispatcherSettings,
    GatewaySettings, LogFormat, LoggingConfig, RateLimitSettings, SamplingSettings, ServerConfig,
    StatsSettings, StorageBackend, StorageSettings, SyncSettings,
};
