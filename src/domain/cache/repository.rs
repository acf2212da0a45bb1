//! Cache trait definition

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::domain::DomainError;

/// Shared key-value and set store used by the gateway hot path
///
/// Values are JSON strings so the trait stays dyn-compatible; typed access
/// goes through [`CacheExt`]. Every operation that the request pipeline relies
/// on for correctness under concurrency (`set_nx_raw`, `increment_with_ttl`,
/// `rename`) must be atomic in the backing store.
#[async_trait]
pub trait Cache: Send + Sync + Debug {
    /// Gets a raw JSON value from the cache
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Sets a raw JSON value in the cache with a TTL
    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError>;

    /// Atomically sets a value only if the key doesn't exist.
    /// Returns true when the value was written.
    async fn set_nx_raw(&self, key: &str, value: &str, ttl: Duration)
        -> Result<bool, DomainError>;

    /// Deletes a key (value or set), returns true if it existed
    async fn delete(&self, key: &str) -> Result<bool, DomainError>;

    /// Checks if a key exists in the cache
    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.get_raw(key).await?.is_some())
    }

    /// Atomically increments a counter, returning the new value.
    /// The TTL is applied when the increment creates the key and left alone otherwise.
    async fn increment_with_ttl(
        &self,
        key: &str,
        delta: i64,
        ttl: Duration,
    ) -> Result<i64, DomainError>;

    /// Adds members to a set, returns the number newly added
    async fn set_add(&self, key: &str, members: &[String]) -> Result<usize, DomainError>;

    /// Removes members from a set, returns the number removed
    async fn set_remove(&self, key: &str, members: &[String]) -> Result<usize, DomainError>;

    /// Tests membership of a single value
    async fn set_contains(&self, key: &str, member: &str) -> Result<bool, DomainError>;

    /// Tests membership of several values, results in input order
    async fn set_contains_many(
        &self,
        key: &str,
        members: &[String],
    ) -> Result<Vec<bool>, DomainError>;

    /// Number of members in a set (0 when missing)
    async fn set_len(&self, key: &str) -> Result<usize, DomainError>;

    /// Atomically renames `from` to `to`, replacing whatever `to` held
    async fn rename(&self, from: &str, to: &str) -> Result<(), DomainError>;

    /// Verifies the backing store is reachable
    async fn ping(&self) -> Result<(), DomainError>;
}

/// Extension trait providing typed get/set operations
pub trait CacheExt: Cache {
    /// Gets a typed value from the cache
    fn get<'a, V>(
        &'a self,
        key: &'a str,
    ) -> impl std::future::Future<Output = Result<Option<V>, DomainError>> + Send
    where
        V: DeserializeOwned + Send,
    {
        async move {
            match self.get_raw(key).await? {
                Some(data) => {
                    let value: V = serde_json::from_str(&data).map_err(|e| {
                        DomainError::cache(format!("Failed to deserialize cache value: {}", e))
                    })?;
                    Ok(Some(value))
                }
                None => Ok(None),
            }
        }
    }

    /// Sets a typed value in the cache with a TTL
    fn set<'a, V>(
        &'a self,
        key: &'a str,
        value: &'a V,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<(), DomainError>> + Send
    where
        V: Serialize + Send + Sync,
    {
        async move {
            let data = serde_json::to_string(value).map_err(|e| {
                DomainError::cache(format!("Failed to serialize cache value: {}", e))
            })?;
            self.set_raw(key, &data, ttl).await
        }
    }
}

// Blanket implementation for all types implementing Cache
impl<T: Cache + ?Sized> CacheExt for T {}
