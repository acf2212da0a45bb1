//! Database migrations infrastructure

use sqlx::postgres::PgPool;

use crate::domain::DomainError;

/// Applies versioned schema migrations, recording each in `_migrations`
#[derive(Debug)]
pub struct PostgresMigrator {
    pool: PgPool,
}

impl PostgresMigrator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the migrations table if it doesn't exist
    async fn ensure_migrations_table(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                description TEXT NOT NULL,
                installed_on TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                success BOOLEAN NOT NULL DEFAULT TRUE
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create migrations table: {}", e)))?;

        Ok(())
    }

    /// Runs a single migration inside a transaction; already applied versions are skipped
    pub async fn run_migration(&self, migration: &Migration) -> Result<bool, DomainError> {
        self.ensure_migrations_table().await?;

        let applied: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM _migrations WHERE version = $1)",
        )
        .bind(migration.version)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to check migration status: {}", e)))?;

        if applied {
            return Ok(false);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to begin migration: {}", e)))?;

        // Migrations hold several statements, which prepared queries reject
        sqlx::raw_sql(&migration.up)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to run migration {}: {}",
                    migration.version, e
                ))
            })?;

        sqlx::query("INSERT INTO _migrations (version, description) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(&migration.description)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to record migration {}: {}",
                    migration.version, e
                ))
            })?;

        tx.commit()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to commit migration: {}", e)))?;

        Ok(true)
    }

    /// Returns the latest applied migration version
    pub async fn current_version(&self) -> Result<Option<i64>, DomainError> {
        self.ensure_migrations_table().await?;

        sqlx::query_scalar("SELECT MAX(version) FROM _migrations WHERE success = TRUE")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get migration version: {}", e)))
    }
}

/// Represents a database migration
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub description: String,
    /// SQL applied when migrating up
    pub up: String,
}

impl Migration {
    pub fn new(version: i64, description: impl Into<String>, up: impl Into<String>) -> Self {
        Self {
            version,
            description: description.into(),
            up: up.into(),
        }
    }
}

/// Schema of the gateway tables
pub fn gateway_migrations() -> Vec<Migration> {
    vec![
        Migration::new(
            1,
            "Create api_credentials table",
            r#"
            CREATE TABLE IF NOT EXISTS api_credentials (
                api_key VARCHAR(64) PRIMARY KEY,
                secret TEXT NOT NULL,
                tenant_id VARCHAR(64) NOT NULL,
                rate_limit INTEGER NOT NULL DEFAULT 0,
                ip_allow_list TEXT[] NOT NULL DEFAULT '{}',
                status VARCHAR(16) NOT NULL DEFAULT 'active',
                expires_at TIMESTAMPTZ,
                last_used_at TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE INDEX IF NOT EXISTS idx_api_credentials_tenant ON api_credentials(tenant_id);
            "#,
        ),
        Migration::new(
            2,
            "Create blacklist_entries table",
            r#"
            CREATE TABLE IF NOT EXISTS blacklist_entries (
                id UUID PRIMARY KEY,
                tenant_id VARCHAR(64) NOT NULL,
                hash_value VARCHAR(128) NOT NULL,
                source VARCHAR(64) NOT NULL DEFAULT '',
                reason TEXT NOT NULL DEFAULT '',
                operator_id VARCHAR(64),
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE UNIQUE INDEX IF NOT EXISTS uq_blacklist_entries_active
                ON blacklist_entries(tenant_id, hash_value) WHERE is_active;
            "#,
        ),
        Migration::new(
            3,
            "Create blacklist_query_logs table",
            r#"
            CREATE TABLE IF NOT EXISTS blacklist_query_logs (
                request_id UUID PRIMARY KEY,
                endpoint VARCHAR(32) NOT NULL,
                tenant_id VARCHAR(64),
                api_key VARCHAR(64),
                client_ip VARCHAR(64),
                hash_count INTEGER NOT NULL,
                matched INTEGER NOT NULL,
                status SMALLINT NOT NULL,
                error_code VARCHAR(32),
                auth_latency_ms DOUBLE PRECISION NOT NULL,
                duration_ms DOUBLE PRECISION NOT NULL,
                reason VARCHAR(16) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_blacklist_query_logs_tenant_time
                ON blacklist_query_logs(tenant_id, created_at);
            "#,
        ),
    ]
}

/// Runs all pending gateway migrations, returning how many were applied
pub async fn run_gateway_migrations(pool: &PgPool) -> Result<usize, DomainError> {
    let migrator = PostgresMigrator::new(pool.clone());
    let mut applied = 0;

    for migration in gateway_migrations() {
        if migrator.run_migration(&migration).await? {
            tracing::info!(
                version = migration.version,
                description = %migration.description,
                "Applied migration"
            );
            applied += 1;
        }
    }

    Ok(applied)
}
