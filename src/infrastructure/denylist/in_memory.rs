//! In-memory denylist repository

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::denylist::{DenylistEntry, DenylistRepository};
use crate::domain::tenant::TenantId;
use crate::domain::DomainError;

/// Denylist entries held in process memory
#[derive(Debug, Default)]
pub struct InMemoryDenylistRepository {
    entries: Arc<RwLock<Vec<DenylistEntry>>>,
}

impl InMemoryDenylistRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<DenylistEntry>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }
}

#[async_trait]
impl DenylistRepository for InMemoryDenylistRepository {
    async fn list_active_hashes(&self, tenant_id: &TenantId) -> Result<Vec<String>, DomainError> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| e.is_active && &e.tenant_id == tenant_id)
            .map(|e| e.hash_value.clone())
            .collect())
    }

    async fn list_tenants(&self) -> Result<Vec<TenantId>, DomainError> {
        let entries = self.entries.read().await;
        let tenants: BTreeSet<TenantId> = entries
            .iter()
            .filter(|e| e.is_active)
            .map(|e| e.tenant_id.clone())
            .collect();
        Ok(tenants.into_iter().collect())
    }

    async fn create(&self, entry: DenylistEntry) -> Result<DenylistEntry, DomainError> {
        let mut entries = self.entries.write().await;

        let duplicate = entry.is_active
            && entries.iter().any(|e| {
                e.is_active && e.tenant_id == entry.tenant_id && e.hash_value == entry.hash_value
            });

        if duplicate {
            return Err(DomainError::conflict(format!(
                "Hash '{}' is already denylisted for tenant '{}'",
                entry.hash_value, entry.tenant_id
            )));
        }

        entries.push(entry.clone());
        Ok(entry)
    }

    async fn deactivate(&self, tenant_id: &TenantId, hash_value: &str) -> Result<bool, DomainError> {
        let mut entries = self.entries.write().await;

        let found = entries
            .iter_mut()
            .find(|e| e.is_active && &e.tenant_id == tenant_id && e.hash_value == hash_value);

        match found {
            Some(entry) => {
                entry.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}
