//! Redis cache implementation

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};

use crate::domain::cache::Cache;
use crate::domain::DomainError;

/// INCRBY that sets the expiry only when the counter has none yet
const INCREMENT_WITH_TTL: &str = r#"
local value = redis.call('INCRBY', KEYS[1], ARGV[1])
if redis.call('PTTL', KEYS[1]) < 0 then
    redis.call('PEXPIRE', KEYS[1], ARGV[2])
end
return value
"#;

/// Configuration for Redis cache
#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Connection timeout
    pub connection_timeout: Duration,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisCacheConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}

/// Redis cache implementation
///
/// Shared by every gateway instance, so nonce markers and rate counters hold
/// across the fleet. Conditional writes map onto single Redis commands
/// (`SET NX EX`, `RENAME`) or a Lua script, which Redis runs atomically.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
    increment_script: Script,
    config: RedisCacheConfig,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisCache {
    /// Creates a new Redis cache connection
    pub async fn new(config: RedisCacheConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| DomainError::cache(format!("Failed to create Redis client: {}", e)))?;

        let connection = tokio::time::timeout(
            config.connection_timeout,
            ConnectionManager::new(client),
        )
        .await
        .map_err(|_| DomainError::timeout("Redis connection"))?
        .map_err(|e| DomainError::cache(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self {
            connection,
            increment_script: Script::new(INCREMENT_WITH_TTL),
            config,
        })
    }

    fn ttl_millis(ttl: Duration) -> u64 {
        (ttl.as_millis() as u64).max(1)
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        let mut conn = self.connection.clone();

        conn.get(key)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to get key '{}': {}", key, e)))
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();

        let _: () = conn
            .pset_ex(key, value, Self::ttl_millis(ttl))
            .await
            .map_err(|e| DomainError::cache(format!("Failed to set key '{}': {}", key, e)))?;

        Ok(())
    }

    async fn set_nx_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        // SET NX PX is a single atomic set-if-absent with expiry
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(Self::ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to set_nx key '{}': {}", key, e)))?;

        // Redis returns "OK" if set, nil if the key existed
        Ok(result.is_some())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        let deleted: i32 = conn
            .del(key)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to delete key '{}': {}", key, e)))?;

        Ok(deleted > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        conn.exists(key).await.map_err(|e| {
            DomainError::cache(format!("Failed to check existence of key '{}': {}", key, e))
        })
    }

    async fn increment_with_ttl(
        &self,
        key: &str,
        delta: i64,
        ttl: Duration,
    ) -> Result<i64, DomainError> {
        let mut conn = self.connection.clone();

        self.increment_script
            .key(key)
            .arg(delta)
            .arg(Self::ttl_millis(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to increment key '{}': {}", key, e)))
    }

    async fn set_add(&self, key: &str, members: &[String]) -> Result<usize, DomainError> {
        if members.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connection.clone();

        conn.sadd(key, members)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to add to set '{}': {}", key, e)))
    }

    async fn set_remove(&self, key: &str, members: &[String]) -> Result<usize, DomainError> {
        if members.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connection.clone();

        conn.srem(key, members)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to remove from set '{}': {}", key, e)))
    }

    async fn set_contains(&self, key: &str, member: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        conn.sismember(key, member)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to query set '{}': {}", key, e)))
    }

    async fn set_contains_many(
        &self,
        key: &str,
        members: &[String],
    ) -> Result<Vec<bool>, DomainError> {
        if members.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.connection.clone();

        redis::cmd("SMISMEMBER")
            .arg(key)
            .arg(members)
            .query_async(&mut conn)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to query set '{}': {}", key, e)))
    }

    async fn set_len(&self, key: &str) -> Result<usize, DomainError> {
        let mut conn = self.connection.clone();

        conn.scard(key)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to size set '{}': {}", key, e)))
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();

        let _: () = conn.rename(from, to).await.map_err(|e| {
            DomainError::cache(format!("Failed to rename '{}' to '{}': {}", from, to, e))
        })?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();

        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| DomainError::cache(format!("Redis ping failed: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::CacheExt;

    // These tests require a running Redis instance
    // Run with: cargo test -- --ignored

    async fn test_cache() -> RedisCache {
        RedisCache::new(RedisCacheConfig::new("redis://127.0.0.1:6379"))
            .await
            .unwrap()
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_set_and_get() {
        let cache = test_cache().await;

        cache
            .set("test:key1", &"value1", Duration::from_secs(60))
            .await
            .unwrap();

        let result: Option<String> = cache.get("test:key1").await.unwrap();
        assert_eq!(result, Some("value1".to_string()));

        cache.delete("test:key1").await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_increment_with_ttl() {
        let cache = test_cache().await;
        let ttl = Duration::from_secs(60);
        cache.delete("test:counter").await.unwrap();

        assert_eq!(cache.increment_with_ttl("test:counter", 5, ttl).await.unwrap(), 5);
        assert_eq!(cache.increment_with_ttl("test:counter", 3, ttl).await.unwrap(), 8);

        cache.delete("test:counter").await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_set_nx() {
        let cache = test_cache().await;
        let ttl = Duration::from_secs(60);
        cache.delete("test:nx").await.unwrap();

        assert!(cache.set_nx_raw("test:nx", "1", ttl).await.unwrap());
        assert!(!cache.set_nx_raw("test:nx", "2", ttl).await.unwrap());

        cache.delete("test:nx").await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_sets_and_rename() {
        let cache = test_cache().await;
        let members = vec!["a".to_string(), "b".to_string()];

        cache.set_add("test:staging", &members).await.unwrap();
        cache.rename("test:staging", "test:live").await.unwrap();

        let found = cache
            .set_contains_many("test:live", &["a".to_string(), "z".to_string()])
            .await
            .unwrap();
        assert_eq!(found, vec![true, false]);
        assert_eq!(cache.set_len("test:live").await.unwrap(), 2);

        cache.delete("test:live").await.unwrap();
    }

    #[test]
    fn test_config() {
        let config = RedisCacheConfig::new("redis://localhost")
            .with_connection_timeout(Duration::from_secs(1));

        assert_eq!(config.url, "redis://localhost");
        assert_eq!(config.connection_timeout, Duration::from_secs(1));
    }
}
