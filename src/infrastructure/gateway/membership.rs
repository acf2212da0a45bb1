//! Denylist membership lookups against the cache
//!
//! The hot path never touches the canonical store. An unreachable or slow
//! cache is an error, never a "not listed" answer.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::cache::{Cache, CacheKeys};
use crate::domain::tenant::TenantId;
use crate::domain::DomainError;

#[derive(Debug, Clone)]
pub struct MembershipCache {
    cache: Arc<dyn Cache>,
    keys: CacheKeys,
    operation_timeout: Duration,
}

impl MembershipCache {
    pub fn new(cache: Arc<dyn Cache>, keys: CacheKeys, operation_timeout: Duration) -> Self {
        Self {
            cache,
            keys,
            operation_timeout,
        }
    }

    pub async fn contains(&self, tenant: &TenantId, hash: &str) -> Result<bool, DomainError> {
        let key = self.keys.denylist(tenant.as_str());
        self.bounded(self.cache.set_contains(&key, hash)).await
    }

    /// Membership of each hash, in input order
    pub async fn contains_many(
        &self,
        tenant: &TenantId,
        hashes: &[String],
    ) -> Result<Vec<bool>, DomainError> {
        let key = self.keys.denylist(tenant.as_str());
        let found = self
            .bounded(self.cache.set_contains_many(&key, hashes))
            .await?;

        if found.len() != hashes.len() {
            return Err(DomainError::cache(format!(
                "Membership lookup returned {} results for {} values",
                found.len(),
                hashes.len()
            )));
        }

        Ok(found)
    }

    async fn bounded<T>(
        &self,
        future: impl std::future::Future<Output = Result<T, DomainError>>,
    ) -> Result<T, DomainError> {
        tokio::time::timeout(self.operation_timeout, future)
            .await
            .map_err(|_| DomainError::timeout("membership lookup"))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockCache;
    use crate::infrastructure::cache::InMemoryCache;

    fn tenant() -> TenantId {
        TenantId::new("acme").unwrap()
    }

    async fn seeded() -> MembershipCache {
        let cache = Arc::new(InMemoryCache::new());
        cache
            .set_add(
                &CacheKeys::default().denylist("acme"),
                &["aa".to_string(), "bb".to_string()],
            )
            .await
            .unwrap();
        MembershipCache::new(cache, CacheKeys::default(), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_contains() {
        let membership = seeded().await;

        assert!(membership.contains(&tenant(), "aa").await.unwrap());
        assert!(!membership.contains(&tenant(), "cc").await.unwrap());
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let membership = seeded().await;
        let other = TenantId::new("globex").unwrap();

        assert!(!membership.contains(&other, "aa").await.unwrap());
        assert_eq!(
            membership.contains_many(&other, &["aa".to_string(), "bb".to_string()]).await.unwrap(),
            vec![false, false]
        );
    }

    #[tokio::test]
    async fn test_contains_many_keeps_order() {
        let membership = seeded().await;
        let hashes = vec!["cc".to_string(), "bb".to_string(), "aa".to_string()];

        let found = membership.contains_many(&tenant(), &hashes).await.unwrap();
        assert_eq!(found, vec![false, true, true]);
    }

    #[tokio::test]
    async fn test_unreachable_cache_is_an_error() {
        let membership = MembershipCache::new(
            Arc::new(MockCache::new().with_error("connection refused")),
            CacheKeys::default(),
            Duration::from_secs(1),
        );

        let err = membership.contains(&tenant(), "aa").await.unwrap_err();
        assert!(err.is_unavailable());
    }
}
