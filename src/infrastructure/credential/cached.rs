//! Read-through caching decorator for a credential directory

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;

use crate::domain::credential::{ApiKey, Credential, CredentialDirectory};
use crate::domain::DomainError;

/// Keeps recently resolved credentials in memory for a short TTL
///
/// Only successful lookups of existing keys are cached, so a newly created
/// credential becomes visible immediately and a revoked one within one TTL.
#[derive(Debug)]
pub struct CachedCredentialDirectory<D: CredentialDirectory> {
    inner: D,
    cache: Cache<ApiKey, Arc<Credential>>,
}

impl<D: CredentialDirectory> CachedCredentialDirectory<D> {
    pub fn new(inner: D, ttl: Duration) -> Self {
        Self::with_capacity(inner, ttl, 10_000)
    }

    pub fn with_capacity(inner: D, ttl: Duration, capacity: u64) -> Self {
        let cache = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(capacity)
            .build();

        Self { inner, cache }
    }

    /// Drop a cached credential, e.g. after a secret rotation
    pub async fn invalidate(&self, api_key: &ApiKey) {
        self.cache.invalidate(api_key).await;
    }
}

#[async_trait]
impl<D: CredentialDirectory> CredentialDirectory for CachedCredentialDirectory<D> {
    async fn get(&self, api_key: &ApiKey) -> Result<Option<Credential>, DomainError> {
        if let Some(cached) = self.cache.get(api_key).await {
            tracing::trace!(api_key = %api_key, "Credential cache hit");
            return Ok(Some((*cached).clone()));
        }

        tracing::debug!(api_key = %api_key, "Credential cache miss");

        let credential = self.inner.get(api_key).await?;

        if let Some(credential) = &credential {
            self.cache
                .insert(api_key.clone(), Arc::new(credential.clone()))
                .await;
        }

        Ok(credential)
    }

    async fn touch_last_used(&self, api_key: &ApiKey, at: DateTime<Utc>) -> Result<(), DomainError> {
        self.inner.touch_last_used(api_key, at).await
    }

    async fn ping(&self) -> Result<(), DomainError> {
        self.inner.ping().await
    }
}
