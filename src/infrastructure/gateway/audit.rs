//! Audit sinks for sampled request entries

use std::fmt::Debug;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::gateway::AuditEntry;
use crate::domain::DomainError;

pub const AUDIT_TARGET: &str = "blacklist_audit";

/// Destination for verbose audit entries
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditSink: Send + Sync + Debug {
    async fn write(&self, entry: &AuditEntry) -> Result<(), DomainError>;
}

/// Writes audit entries as structured log events
#[derive(Debug, Clone, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn write(&self, entry: &AuditEntry) -> Result<(), DomainError> {
        tracing::info!(
            target: AUDIT_TARGET,
            request_id = %entry.request_id,
            endpoint = entry.endpoint,
            tenant_id = entry.tenant_id.as_ref().map(|t| t.as_str()),
            api_key = entry.api_key.as_deref(),
            client_ip = entry.client_ip.as_deref(),
            hash_count = entry.hash_count,
            matched = entry.matched,
            status = entry.status,
            error_code = entry.error_code,
            auth_latency_ms = entry.auth_latency_ms,
            duration_ms = entry.duration_ms,
            reason = entry.reason.as_str(),
            "Blacklist query"
        );
        Ok(())
    }
}

/// Persists audit entries to `blacklist_query_logs`
#[derive(Debug, Clone)]
pub struct PostgresAuditSink {
    pool: PgPool,
}

impl PostgresAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PostgresAuditSink {
    async fn write(&self, entry: &AuditEntry) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO blacklist_query_logs (request_id, endpoint, tenant_id, api_key, client_ip,
                                              hash_count, matched, status, error_code,
                                              auth_latency_ms, duration_ms, reason, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (request_id) DO NOTHING
            "#,
        )
        .bind(entry.request_id)
        .bind(entry.endpoint)
        .bind(entry.tenant_id.as_ref().map(|t| t.as_str()))
        .bind(entry.api_key.as_deref())
        .bind(entry.client_ip.as_deref())
        .bind(entry.hash_count as i32)
        .bind(entry.matched as i32)
        .bind(entry.status as i16)
        .bind(entry.error_code)
        .bind(entry.auth_latency_ms)
        .bind(entry.duration_ms)
        .bind(entry.reason.as_str())
        .bind(entry.at)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to write audit entry: {}", e)))?;

        Ok(())
    }
}
