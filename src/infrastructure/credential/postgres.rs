//! PostgreSQL credential directory

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::domain::credential::{ApiKey, Credential, CredentialDirectory, CredentialStatus};
use crate::domain::tenant::TenantId;
use crate::domain::DomainError;
use crate::infrastructure::storage::map_write_error;

/// PostgreSQL implementation of CredentialDirectory backed by `api_credentials`
#[derive(Debug, Clone)]
pub struct PostgresCredentialDirectory {
    pool: PgPool,
}

impl PostgresCredentialDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or replace a credential from the seed file; `last_used_at` of an
    /// existing row is kept
    pub async fn upsert(&self, credential: &Credential) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO api_credentials (api_key, secret, tenant_id, rate_limit, ip_allow_list,
                                         status, expires_at, last_used_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (api_key) DO UPDATE
            SET secret = EXCLUDED.secret, tenant_id = EXCLUDED.tenant_id,
                rate_limit = EXCLUDED.rate_limit, ip_allow_list = EXCLUDED.ip_allow_list,
                status = EXCLUDED.status, expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(credential.api_key().as_str())
        .bind(credential.secret())
        .bind(credential.tenant_id().as_str())
        .bind(credential.rate_limit() as i32)
        .bind(credential.ip_allow_list())
        .bind(credential.status().as_str())
        .bind(credential.expires_at())
        .bind(credential.last_used_at())
        .bind(credential.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Failed to upsert credential"))?;

        Ok(())
    }
}

#[async_trait]
impl CredentialDirectory for PostgresCredentialDirectory {
    async fn get(&self, api_key: &ApiKey) -> Result<Option<Credential>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT api_key, secret, tenant_id, rate_limit, ip_allow_list, status,
                   expires_at, last_used_at, created_at
            FROM api_credentials
            WHERE api_key = $1
            "#,
        )
        .bind(api_key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get credential: {}", e)))?;

        row.as_ref().map(row_to_credential).transpose()
    }

    async fn touch_last_used(&self, api_key: &ApiKey, at: DateTime<Utc>) -> Result<(), DomainError> {
        sqlx::query("UPDATE api_credentials SET last_used_at = $2 WHERE api_key = $1")
            .bind(api_key.as_str())
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to touch credential: {}", e)))?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Credential store unreachable: {}", e)))?;

        Ok(())
    }
}

fn row_to_credential(row: &sqlx::postgres::PgRow) -> Result<Credential, DomainError> {
    let api_key: String = row.get("api_key");
    let secret: String = row.get("secret");
    let tenant_id: String = row.get("tenant_id");
    let rate_limit: i32 = row.get("rate_limit");
    let ip_allow_list: Vec<String> = row.get("ip_allow_list");
    let status: String = row.get("status");
    let expires_at: Option<DateTime<Utc>> = row.get("expires_at");
    let last_used_at: Option<DateTime<Utc>> = row.get("last_used_at");
    let created_at: DateTime<Utc> = row.get("created_at");

    let api_key = ApiKey::new(api_key)
        .map_err(|e| DomainError::storage(format!("Invalid API key in database: {}", e)))?;
    let tenant_id = TenantId::new(tenant_id)
        .map_err(|e| DomainError::storage(format!("Invalid tenant ID in database: {}", e)))?;
    let status: CredentialStatus = status
        .parse()
        .map_err(|e| DomainError::storage(format!("Invalid status in database: {}", e)))?;

    let mut credential = Credential::new(api_key, secret, tenant_id)
        .with_rate_limit(rate_limit.max(0) as u32)
        .with_ip_allow_list(ip_allow_list)
        .with_status(status)
        .with_last_used_at(last_used_at)
        .with_created_at(created_at);

    if let Some(expires_at) = expires_at {
        credential = credential.with_expiration(expires_at);
    }

    Ok(credential)
}
