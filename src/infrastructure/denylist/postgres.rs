//! PostgreSQL denylist repository

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::denylist::{DenylistEntry, DenylistRepository};
use crate::domain::tenant::TenantId;
use crate::domain::DomainError;
use crate::infrastructure::storage::map_write_error;

/// PostgreSQL implementation of DenylistRepository backed by `blacklist_entries`
#[derive(Debug, Clone)]
pub struct PostgresDenylistRepository {
    pool: PgPool,
}

impl PostgresDenylistRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DenylistRepository for PostgresDenylistRepository {
    async fn list_active_hashes(&self, tenant_id: &TenantId) -> Result<Vec<String>, DomainError> {
        sqlx::query_scalar(
            "SELECT hash_value FROM blacklist_entries WHERE tenant_id = $1 AND is_active",
        )
        .bind(tenant_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list denylist entries: {}", e)))
    }

    async fn list_tenants(&self) -> Result<Vec<TenantId>, DomainError> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT tenant_id FROM blacklist_entries WHERE is_active ORDER BY tenant_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list tenants: {}", e)))?;

        ids.into_iter()
            .map(|id| {
                TenantId::new(id).map_err(|e| {
                    DomainError::storage(format!("Invalid tenant ID in database: {}", e))
                })
            })
            .collect()
    }

    async fn create(&self, entry: DenylistEntry) -> Result<DenylistEntry, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO blacklist_entries (id, tenant_id, hash_value, source, reason,
                                           operator_id, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id)
        .bind(entry.tenant_id.as_str())
        .bind(&entry.hash_value)
        .bind(&entry.source)
        .bind(&entry.reason)
        .bind(entry.operator_id.as_deref())
        .bind(entry.is_active)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_write_error(
                e,
                &format!(
                    "Failed to denylist hash '{}' for tenant '{}'",
                    entry.hash_value, entry.tenant_id
                ),
            )
        })?;

        Ok(entry)
    }

    async fn deactivate(&self, tenant_id: &TenantId, hash_value: &str) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE blacklist_entries SET is_active = FALSE
            WHERE tenant_id = $1 AND hash_value = $2 AND is_active
            "#,
        )
        .bind(tenant_id.as_str())
        .bind(hash_value)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to deactivate entry: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Denylist store unreachable: {}", e)))?;

        Ok(())
    }
}
