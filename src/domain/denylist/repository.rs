//! Denylist repository trait

use std::fmt::Debug;

use async_trait::async_trait;

use super::entity::DenylistEntry;
use crate::domain::tenant::TenantId;
use crate::domain::DomainError;

/// Canonical relational store of denylist entries
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DenylistRepository: Send + Sync + Debug {
    /// Hash values of every active entry for a tenant
    async fn list_active_hashes(&self, tenant_id: &TenantId) -> Result<Vec<String>, DomainError>;

    /// Tenants that own at least one active entry
    async fn list_tenants(&self) -> Result<Vec<TenantId>, DomainError>;

    /// Insert an entry; fails with a conflict if an active duplicate exists
    async fn create(&self, entry: DenylistEntry) -> Result<DenylistEntry, DomainError>;

    /// Deactivate the active entry for a hash, returns true if one was found
    async fn deactivate(&self, tenant_id: &TenantId, hash_value: &str) -> Result<bool, DomainError>;

    /// Verify the store is reachable
    async fn ping(&self) -> Result<(), DomainError>;
}
