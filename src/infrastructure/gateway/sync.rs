//! Cache sync engine
//!
//! Projects the canonical denylist into the membership cache. A full sync
//! builds the tenant's set under a fresh staging key and renames it over the
//! live key, so readers see either the old set or the complete new one.
//! Syncs for the same tenant are serialized.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::cache::{Cache, CacheKeys};
use crate::domain::denylist::DenylistRepository;
use crate::domain::gateway::duration_ms;
use crate::domain::tenant::TenantId;
use crate::domain::DomainError;
use crate::infrastructure::observability::record_sync;

/// Outcome of one sync operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub tenant_id: TenantId,
    /// Entries in the live set after a full sync, or entries touched by an incremental one
    pub entries: usize,
    pub duration_ms: f64,
}

/// Per-tenant result of [`CacheSyncEngine::sync_all`]
#[derive(Debug, Serialize)]
pub struct SyncFailure {
    pub tenant_id: TenantId,
    pub error: String,
}

/// Results of syncing every tenant
#[derive(Debug, Default, Serialize)]
pub struct SyncAllReport {
    pub synced: Vec<SyncReport>,
    pub failed: Vec<SyncFailure>,
}

impl SyncAllReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug)]
pub struct CacheSyncEngine {
    repository: Arc<dyn DenylistRepository>,
    cache: Arc<dyn Cache>,
    keys: CacheKeys,
    batch_size: usize,
    locks: Mutex<HashMap<TenantId, Arc<Mutex<()>>>>,
}

impl CacheSyncEngine {
    pub fn new(
        repository: Arc<dyn DenylistRepository>,
        cache: Arc<dyn Cache>,
        keys: CacheKeys,
        batch_size: usize,
    ) -> Self {
        Self {
            repository,
            cache,
            keys,
            batch_size: batch_size.max(1),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Replace a tenant's cached set with the active entries of the store
    ///
    /// When the store cannot be read the live set is left as it was.
    pub async fn sync_tenant(&self, tenant_id: &TenantId) -> Result<SyncReport, DomainError> {
        let lock = self.tenant_lock(tenant_id).await;
        let _guard = lock.lock().await;

        let started = Instant::now();
        let result = self.rebuild(tenant_id).await;
        record_sync(result.is_ok());

        match result {
            Ok(entries) => {
                let report = SyncReport {
                    tenant_id: tenant_id.clone(),
                    entries,
                    duration_ms: duration_ms(started.elapsed()),
                };
                tracing::info!(
                    tenant_id = %tenant_id,
                    entries = report.entries,
                    duration_ms = report.duration_ms,
                    "Denylist cache synced"
                );
                Ok(report)
            }
            Err(e) => {
                tracing::error!(tenant_id = %tenant_id, error = %e, "Denylist cache sync failed");
                Err(e)
            }
        }
    }

    /// Full sync of every tenant the store knows about
    ///
    /// A failing tenant does not stop the others.
    pub async fn sync_all(&self) -> Result<SyncAllReport, DomainError> {
        let tenants = self.repository.list_tenants().await?;
        let mut report = SyncAllReport::default();

        for tenant_id in tenants {
            match self.sync_tenant(&tenant_id).await {
                Ok(synced) => report.synced.push(synced),
                Err(e) => report.failed.push(SyncFailure {
                    tenant_id,
                    error: e.to_string(),
                }),
            }
        }

        Ok(report)
    }

    /// Add hashes to the live set without a full rebuild
    pub async fn add_entries(
        &self,
        tenant_id: &TenantId,
        hashes: &[String],
    ) -> Result<SyncReport, DomainError> {
        let lock = self.tenant_lock(tenant_id).await;
        let _guard = lock.lock().await;

        let started = Instant::now();
        let key = self.keys.denylist(tenant_id.as_str());
        let mut added = 0;
        for chunk in hashes.chunks(self.batch_size) {
            added += self.cache.set_add(&key, chunk).await?;
        }

        Ok(SyncReport {
            tenant_id: tenant_id.clone(),
            entries: added,
            duration_ms: duration_ms(started.elapsed()),
        })
    }

    /// Remove hashes from the live set without a full rebuild
    pub async fn remove_entries(
        &self,
        tenant_id: &TenantId,
        hashes: &[String],
    ) -> Result<SyncReport, DomainError> {
        let lock = self.tenant_lock(tenant_id).await;
        let _guard = lock.lock().await;

        let started = Instant::now();
        let key = self.keys.denylist(tenant_id.as_str());
        let mut removed = 0;
        for chunk in hashes.chunks(self.batch_size) {
            removed += self.cache.set_remove(&key, chunk).await?;
        }

        Ok(SyncReport {
            tenant_id: tenant_id.clone(),
            entries: removed,
            duration_ms: duration_ms(started.elapsed()),
        })
    }

    async fn rebuild(&self, tenant_id: &TenantId) -> Result<usize, DomainError> {
        let hashes = self.repository.list_active_hashes(tenant_id).await?;
        let live = self.keys.denylist(tenant_id.as_str());

        if hashes.is_empty() {
            self.cache.delete(&live).await?;
            return Ok(0);
        }

        let staging = self
            .keys
            .denylist_staging(tenant_id.as_str(), &Uuid::new_v4().simple().to_string());

        let swapped = match self.populate(&staging, &hashes).await {
            Ok(()) => self.cache.rename(&staging, &live).await,
            Err(e) => Err(e),
        };

        if let Err(e) = swapped {
            if let Err(cleanup) = self.cache.delete(&staging).await {
                tracing::warn!(key = %staging, error = %cleanup, "Failed to delete staging set");
            }
            return Err(e);
        }

        self.cache.set_len(&live).await
    }

    async fn populate(&self, staging: &str, hashes: &[String]) -> Result<(), DomainError> {
        for chunk in hashes.chunks(self.batch_size) {
            self.cache.set_add(staging, chunk).await?;
        }
        Ok(())
    }

    async fn tenant_lock(&self, tenant_id: &TenantId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(tenant_id.clone()).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockCache;
    use crate::domain::denylist::{DenylistEntry, MockDenylistRepository};
    use crate::infrastructure::cache::InMemoryCache;
    use crate::infrastructure::denylist::InMemoryDenylistRepository;

    fn tenant(id: &str) -> TenantId {
        TenantId::new(id).unwrap()
    }

    fn hash(n: u32) -> String {
        format!("{:032x}", n)
    }

    fn entry(t: &str, n: u32) -> DenylistEntry {
        DenylistEntry::new(tenant(t), hash(n))
    }

    struct Fixture {
        engine: CacheSyncEngine,
        repository: Arc<InMemoryDenylistRepository>,
        cache: Arc<InMemoryCache>,
    }

    fn fixture(entries: Vec<DenylistEntry>) -> Fixture {
        let repository = Arc::new(InMemoryDenylistRepository::with_entries(entries));
        let cache = Arc::new(InMemoryCache::new());
        let engine = CacheSyncEngine::new(repository.clone(), cache.clone(), CacheKeys::default(), 2);
        Fixture {
            engine,
            repository,
            cache,
        }
    }

    #[tokio::test]
    async fn test_full_sync_builds_live_set() {
        let f = fixture(vec![entry("acme", 1), entry("acme", 2), entry("acme", 3)]);

        let report = f.engine.sync_tenant(&tenant("acme")).await.unwrap();
        assert_eq!(report.entries, 3);

        let live = CacheKeys::default().denylist("acme");
        assert!(f.cache.set_contains(&live, &hash(2)).await.unwrap());
        assert!(!f.cache.set_contains(&live, &hash(9)).await.unwrap());
    }

    #[tokio::test]
    async fn test_entries_created_after_sync_are_stale_until_next_sync() {
        let f = fixture(vec![entry("acme", 1)]);
        let live = CacheKeys::default().denylist("acme");

        f.engine.sync_tenant(&tenant("acme")).await.unwrap();
        f.repository.create(entry("acme", 2)).await.unwrap();

        assert!(!f.cache.set_contains(&live, &hash(2)).await.unwrap());

        f.engine.sync_tenant(&tenant("acme")).await.unwrap();
        assert!(f.cache.set_contains(&live, &hash(2)).await.unwrap());
    }

    #[tokio::test]
    async fn test_resync_drops_deactivated_entries() {
        let f = fixture(vec![entry("acme", 1), entry("acme", 2)]);
        let live = CacheKeys::default().denylist("acme");
        f.engine.sync_tenant(&tenant("acme")).await.unwrap();

        f.repository.deactivate(&tenant("acme"), &hash(1)).await.unwrap();
        let report = f.engine.sync_tenant(&tenant("acme")).await.unwrap();

        assert_eq!(report.entries, 1);
        assert!(!f.cache.set_contains(&live, &hash(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_sync_of_empty_tenant_clears_live_set() {
        let f = fixture(vec![entry("acme", 1)]);
        let live = CacheKeys::default().denylist("acme");
        f.engine.sync_tenant(&tenant("acme")).await.unwrap();

        f.repository.deactivate(&tenant("acme"), &hash(1)).await.unwrap();
        let report = f.engine.sync_tenant(&tenant("acme")).await.unwrap();

        assert_eq!(report.entries, 0);
        assert_eq!(f.cache.set_len(&live).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_leaves_cache_untouched() {
        let cache = Arc::new(InMemoryCache::new());
        let live = CacheKeys::default().denylist("acme");
        cache.set_add(&live, &[hash(1)]).await.unwrap();

        let mut repository = MockDenylistRepository::new();
        repository
            .expect_list_active_hashes()
            .returning(|_| Err(DomainError::storage("connection refused")));

        let engine = CacheSyncEngine::new(Arc::new(repository), cache.clone(), CacheKeys::default(), 100);

        assert!(engine.sync_tenant(&tenant("acme")).await.is_err());
        assert!(cache.set_contains(&live, &hash(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_cache_failure_during_build_keeps_live_set_and_cleans_staging() {
        let cache = Arc::new(MockCache::new());
        let live = CacheKeys::default().denylist("acme");
        cache.set_add(&live, &[hash(1)]).await.unwrap();

        let mut repository = MockDenylistRepository::new();
        let failing = cache.clone();
        repository.expect_list_active_hashes().returning(move |_| {
            // The store answers, then the cache drops out mid-build
            failing.set_error(Some("connection reset".to_string()));
            Ok(vec![hash(2), hash(3)])
        });

        let engine = CacheSyncEngine::new(Arc::new(repository), cache.clone(), CacheKeys::default(), 1);
        assert!(engine.sync_tenant(&tenant("acme")).await.is_err());

        cache.set_error(None);
        assert!(cache.set_contains(&live, &hash(1)).await.unwrap());
        assert!(!cache.set_contains(&live, &hash(2)).await.unwrap());
        assert_eq!(cache.set_keys(), vec![live]);
    }

    #[tokio::test]
    async fn test_failed_swap_deletes_staging_set() {
        let cache = Arc::new(MockCache::new());
        let live = CacheKeys::default().denylist("acme");
        cache.set_add(&live, &[hash(1)]).await.unwrap();
        cache.fail_renames("READONLY replica");

        let mut repository = MockDenylistRepository::new();
        repository
            .expect_list_active_hashes()
            .returning(|_| Ok(vec![hash(2), hash(3)]));

        let engine = CacheSyncEngine::new(Arc::new(repository), cache.clone(), CacheKeys::default(), 100);
        assert!(engine.sync_tenant(&tenant("acme")).await.is_err());

        assert!(cache.set_contains(&live, &hash(1)).await.unwrap());
        assert_eq!(cache.set_keys(), vec![live]);
    }

    #[tokio::test]
    async fn test_sync_all_reports_per_tenant() {
        let mut repository = MockDenylistRepository::new();
        repository
            .expect_list_tenants()
            .returning(|| Ok(vec![tenant("acme"), tenant("globex")]));
        repository
            .expect_list_active_hashes()
            .returning(|t| match t.as_str() {
                "acme" => Ok(vec![hash(1)]),
                _ => Err(DomainError::storage("timeout")),
            });

        let engine = CacheSyncEngine::new(
            Arc::new(repository),
            Arc::new(InMemoryCache::new()),
            CacheKeys::default(),
            100,
        );

        let report = engine.sync_all().await.unwrap();
        assert!(!report.is_success());
        assert_eq!(report.synced.len(), 1);
        assert_eq!(report.synced[0].tenant_id, tenant("acme"));
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].tenant_id, tenant("globex"));
    }

    #[tokio::test]
    async fn test_incremental_add_and_remove() {
        let f = fixture(vec![]);
        let live = CacheKeys::default().denylist("acme");
        let hashes = vec![hash(1), hash(2), hash(3)];

        let added = f.engine.add_entries(&tenant("acme"), &hashes).await.unwrap();
        assert_eq!(added.entries, 3);

        let removed = f
            .engine
            .remove_entries(&tenant("acme"), &[hash(2), hash(7)])
            .await
            .unwrap();
        assert_eq!(removed.entries, 1);
        assert_eq!(f.cache.set_len(&live).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_syncs_of_one_tenant_are_serialized() {
        let f = fixture((0..50).map(|n| entry("acme", n)).collect());
        let engine = Arc::new(f.engine);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                tokio::spawn(async move { engine.sync_tenant(&tenant("acme")).await.unwrap() })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().entries, 50);
        }
        assert_eq!(f.cache.set_len(&CacheKeys::default().denylist("acme")).await.unwrap(), 50);
    }
}
