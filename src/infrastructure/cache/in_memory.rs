//! In-memory cache implementation using moka

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use moka::ops::compute::{CompResult, Op};
use moka::Expiry;
use tokio::sync::RwLock;

use crate::domain::cache::Cache;
use crate::domain::DomainError;

/// Configuration for in-memory cache
#[derive(Debug, Clone)]
pub struct InMemoryCacheConfig {
    /// Maximum number of live key-value entries (nonces, counters); writes of
    /// new keys beyond it fail instead of evicting existing entries
    pub max_capacity: u64,
}

impl Default for InMemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 1_000_000,
        }
    }
}

impl InMemoryCacheConfig {
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }
}

/// Cache entry stored in moka
#[derive(Debug, Clone)]
struct CacheEntry {
    data: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(data: String, ttl: Duration) -> Self {
        Self {
            data,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Per-entry expiry driven by the absolute deadline stored in the entry
struct EntryExpiry;

impl Expiry<String, CacheEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        created_at: Instant,
    ) -> Option<Duration> {
        Some(value.expires_at.saturating_duration_since(created_at))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.expires_at.saturating_duration_since(updated_at))
    }
}

/// Process-local cache for single-instance deployments and tests
///
/// Key-value entries (nonces, rate counters, hourly stats) live in moka with
/// a per-entry TTL and leave only when it expires, never by size eviction.
/// Once `max_capacity` live entries exist, writes of new keys return a cache
/// error.
/// Conditional writes go through moka's atomic compute API.
/// Denylist sets are kept in a lock-guarded map and never expire.
#[derive(Debug)]
pub struct InMemoryCache {
    entries: MokaCache<String, CacheEntry>,
    sets: RwLock<HashMap<String, HashSet<String>>>,
    max_capacity: u64,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::with_config(InMemoryCacheConfig::default())
    }

    pub fn with_config(config: InMemoryCacheConfig) -> Self {
        let entries = MokaCache::builder().expire_after(EntryExpiry).build();

        Self {
            entries,
            sets: RwLock::new(HashMap::new()),
            max_capacity: config.max_capacity,
        }
    }

    /// Refuse a new key once the cache holds `max_capacity` entries
    ///
    /// moka's entry count trails recent writes, so the bound is approximate;
    /// it is never enforced by evicting.
    async fn admit(&self, key: &str) -> Result<(), DomainError> {
        if self.entries.contains_key(key) || self.entries.entry_count() < self.max_capacity {
            return Ok(());
        }

        // Expired entries are counted until housekeeping removes them
        self.entries.run_pending_tasks().await;
        if self.entries.entry_count() < self.max_capacity {
            return Ok(());
        }

        Err(DomainError::cache(format!(
            "In-memory cache is full ({} entries)",
            self.max_capacity
        )))
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        let now = Instant::now();
        Ok(self
            .entries
            .get(key)
            .await
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.data))
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        self.admit(key).await?;
        self.entries
            .insert(key.to_string(), CacheEntry::new(value.to_string(), ttl))
            .await;
        Ok(())
    }

    async fn set_nx_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, DomainError> {
        self.admit(key).await?;
        let now = Instant::now();
        let value = value.to_string();

        let result = self
            .entries
            .entry(key.to_string())
            .and_compute_with(|existing| {
                let op = match existing {
                    Some(entry) if entry.value().is_live(now) => Op::Nop,
                    _ => Op::Put(CacheEntry::new(value, ttl)),
                };
                std::future::ready(op)
            })
            .await;

        Ok(matches!(
            result,
            CompResult::Inserted(_) | CompResult::ReplacedWith(_)
        ))
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let removed_value = self.entries.remove(key).await.is_some();
        let removed_set = self.sets.write().await.remove(key).is_some();
        Ok(removed_value || removed_set)
    }

    async fn increment_with_ttl(
        &self,
        key: &str,
        delta: i64,
        ttl: Duration,
    ) -> Result<i64, DomainError> {
        self.admit(key).await?;
        let now = Instant::now();

        let result = self
            .entries
            .entry(key.to_string())
            .and_compute_with(|existing| {
                let entry = match existing.map(|e| e.into_value()) {
                    Some(entry) if entry.is_live(now) => {
                        let current: i64 = entry.data.parse().unwrap_or(0);
                        CacheEntry {
                            data: (current + delta).to_string(),
                            expires_at: entry.expires_at,
                        }
                    }
                    _ => CacheEntry::new(delta.to_string(), ttl),
                };
                std::future::ready(Op::Put(entry))
            })
            .await;

        let entry = result
            .into_entry()
            .ok_or_else(|| DomainError::cache(format!("Counter '{}' vanished during increment", key)))?;

        entry
            .into_value()
            .data
            .parse()
            .map_err(|e| DomainError::cache(format!("Counter '{}' is not an integer: {}", key, e)))
    }

    async fn set_add(&self, key: &str, members: &[String]) -> Result<usize, DomainError> {
        let mut sets = self.sets.write().await;
        let set = sets.entry(key.to_string()).or_default();
        Ok(members.iter().filter(|m| set.insert((*m).clone())).count())
    }

    async fn set_remove(&self, key: &str, members: &[String]) -> Result<usize, DomainError> {
        let mut sets = self.sets.write().await;

        let Some(set) = sets.get_mut(key) else {
            return Ok(0);
        };

        let removed = members.iter().filter(|m| set.remove(*m)).count();
        if set.is_empty() {
            sets.remove(key);
        }

        Ok(removed)
    }

    async fn set_contains(&self, key: &str, member: &str) -> Result<bool, DomainError> {
        let sets = self.sets.read().await;
        Ok(sets.get(key).is_some_and(|set| set.contains(member)))
    }

    async fn set_contains_many(
        &self,
        key: &str,
        members: &[String],
    ) -> Result<Vec<bool>, DomainError> {
        let sets = self.sets.read().await;
        let set = sets.get(key);
        Ok(members
            .iter()
            .map(|m| set.is_some_and(|s| s.contains(m)))
            .collect())
    }

    async fn set_len(&self, key: &str) -> Result<usize, DomainError> {
        Ok(self.sets.read().await.get(key).map_or(0, HashSet::len))
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), DomainError> {
        let mut sets = self.sets.write().await;

        match sets.remove(from) {
            Some(set) => {
                sets.insert(to.to_string(), set);
                Ok(())
            }
            None => Err(DomainError::cache(format!("No such key '{}'", from))),
        }
    }

    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::cache::CacheExt;

    fn members(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = InMemoryCache::new();

        cache
            .set("key1", &"value1", Duration::from_secs(60))
            .await
            .unwrap();

        let result: Option<String> = cache.get("key1").await.unwrap();
        assert_eq!(result, Some("value1".to_string()));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let cache = InMemoryCache::new();

        let result: Option<String> = cache.get("missing").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = InMemoryCache::new();

        cache
            .set("key1", &"value1", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(cache.delete("key1").await.unwrap());
        assert!(!cache.delete("key1").await.unwrap());
        assert!(!cache.exists("key1").await.unwrap());
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let cache = InMemoryCache::new();

        cache
            .set("key1", &"value1", Duration::from_millis(50))
            .await
            .unwrap();
        assert!(cache.exists("key1").await.unwrap());

        tokio::time::sleep(Duration::from_millis(100)).await;

        let result: Option<String> = cache.get("key1").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_set_nx() {
        let cache = InMemoryCache::new();
        let ttl = Duration::from_secs(60);

        assert!(cache.set_nx_raw("nonce", "1", ttl).await.unwrap());
        assert!(!cache.set_nx_raw("nonce", "2", ttl).await.unwrap());

        assert_eq!(cache.get_raw("nonce").await.unwrap(), Some("1".to_string()));
    }

    #[tokio::test]
    async fn test_set_nx_after_expiry() {
        let cache = InMemoryCache::new();

        assert!(cache
            .set_nx_raw("nonce", "1", Duration::from_millis(30))
            .await
            .unwrap());

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(cache
            .set_nx_raw("nonce", "1", Duration::from_secs(60))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_set_nx_single_winner() {
        let cache = Arc::new(InMemoryCache::new());

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    cache
                        .set_nx_raw("shared", "1", Duration::from_secs(60))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_increment_with_ttl() {
        let cache = InMemoryCache::new();
        let ttl = Duration::from_secs(60);

        assert_eq!(cache.increment_with_ttl("counter", 5, ttl).await.unwrap(), 5);
        assert_eq!(cache.increment_with_ttl("counter", 3, ttl).await.unwrap(), 8);
        assert_eq!(cache.increment_with_ttl("counter", -2, ttl).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_increment_restarts_after_expiry() {
        let cache = InMemoryCache::new();

        cache
            .increment_with_ttl("counter", 4, Duration::from_millis(30))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(
            cache
                .increment_with_ttl("counter", 1, Duration::from_secs(60))
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let cache = Arc::new(InMemoryCache::new());

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    cache
                        .increment_with_ttl("hits", 1, Duration::from_secs(60))
                        .await
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(cache.get_raw("hits").await.unwrap(), Some("50".to_string()));
    }

    #[tokio::test]
    async fn test_full_cache_keeps_nonces_and_counters() {
        let cache = InMemoryCache::with_config(InMemoryCacheConfig::default().with_max_capacity(100));
        let ttl = Duration::from_secs(300);

        assert!(cache.set_nx_raw("nonce:victim", "1", ttl).await.unwrap());
        for _ in 0..5 {
            cache.increment_with_ttl("rl:victim", 1, ttl).await.unwrap();
        }

        for i in 0..5000 {
            let _ = cache.set_nx_raw(&format!("nonce:{}", i), "1", ttl).await;
        }
        cache.entries.run_pending_tasks().await;

        assert!(!cache.set_nx_raw("nonce:victim", "1", ttl).await.unwrap());
        assert_eq!(cache.increment_with_ttl("rl:victim", 1, ttl).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_full_cache_rejects_new_keys() {
        let cache = InMemoryCache::with_config(InMemoryCacheConfig::default().with_max_capacity(3));
        let ttl = Duration::from_secs(60);

        for key in ["a", "b", "c"] {
            assert!(cache.set_nx_raw(key, "1", ttl).await.unwrap());
        }
        cache.entries.run_pending_tasks().await;

        assert!(cache.set_nx_raw("d", "1", ttl).await.is_err());
        assert!(cache.increment_with_ttl("e", 1, ttl).await.is_err());
        assert!(cache.set_raw("f", "1", ttl).await.is_err());
        assert_eq!(cache.increment_with_ttl("a", 1, ttl).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_expired_entries_free_capacity() {
        let cache = InMemoryCache::with_config(InMemoryCacheConfig::default().with_max_capacity(2));

        cache.set_nx_raw("a", "1", Duration::from_millis(20)).await.unwrap();
        cache.set_nx_raw("b", "1", Duration::from_millis(20)).await.unwrap();
        cache.entries.run_pending_tasks().await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(cache.set_nx_raw("c", "1", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_membership() {
        let cache = InMemoryCache::new();

        assert_eq!(cache.set_add("s", &members(&["a", "b", "a"])).await.unwrap(), 2);
        assert!(cache.set_contains("s", "a").await.unwrap());
        assert!(!cache.set_contains("s", "c").await.unwrap());
        assert!(!cache.set_contains("missing", "a").await.unwrap());

        let many = cache
            .set_contains_many("s", &members(&["b", "c", "a"]))
            .await
            .unwrap();
        assert_eq!(many, vec![true, false, true]);

        assert_eq!(cache.set_remove("s", &members(&["a", "z"])).await.unwrap(), 1);
        assert_eq!(cache.set_len("s").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rename_replaces_target() {
        let cache = InMemoryCache::new();

        cache.set_add("live", &members(&["old"])).await.unwrap();
        cache.set_add("staging", &members(&["new1", "new2"])).await.unwrap();

        cache.rename("staging", "live").await.unwrap();

        assert!(!cache.set_contains("live", "old").await.unwrap());
        assert!(cache.set_contains("live", "new1").await.unwrap());
        assert_eq!(cache.set_len("staging").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rename_missing_source_fails() {
        let cache = InMemoryCache::new();
        cache.set_add("live", &members(&["keep"])).await.unwrap();

        assert!(cache.rename("nothing", "live").await.is_err());
        assert!(cache.set_contains("live", "keep").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_removes_sets() {
        let cache = InMemoryCache::new();
        cache.set_add("s", &members(&["a"])).await.unwrap();

        assert!(cache.delete("s").await.unwrap());
        assert_eq!(cache.set_len("s").await.unwrap(), 0);
    }
}
