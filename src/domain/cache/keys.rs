//! Cache key layout for the gateway
//!
//! All gateway keys live under a single configurable namespace (`bl` by
//! default) so they can be scanned or flushed together.

use chrono::{DateTime, Utc};

/// Builds the cache keys used by the gateway components
#[derive(Debug, Clone)]
pub struct CacheKeys {
    namespace: String,
}

impl Default for CacheKeys {
    fn default() -> Self {
        Self::new("bl")
    }
}

impl CacheKeys {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Live denylist set for a tenant
    pub fn denylist(&self, tenant_id: &str) -> String {
        format!("{}:set:{}", self.namespace, tenant_id)
    }

    /// Build target for a full sync; renamed over the live key once complete
    pub fn denylist_staging(&self, tenant_id: &str, build_id: &str) -> String {
        format!("{}:set:{}:staging:{}", self.namespace, tenant_id, build_id)
    }

    /// Replay-protection marker for a nonce
    pub fn nonce(&self, api_key: &str, nonce: &str) -> String {
        format!("{}:nonce:{}:{}", self.namespace, api_key, nonce)
    }

    /// Rate-limit counter for one window of one credential
    pub fn rate_window(&self, api_key: &str, window_index: i64) -> String {
        format!("{}:rl:{}:{}", self.namespace, api_key, window_index)
    }

    /// Hourly statistics counter
    pub fn hourly_stat(&self, tenant_id: &str, hour: DateTime<Utc>, field: &str) -> String {
        format!(
            "{}:stats:{}:{}:{}",
            self.namespace,
            tenant_id,
            hour.format("%Y%m%d%H"),
            field
        )
    }
}
