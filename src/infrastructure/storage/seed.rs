//! JSON seed data for credentials and denylist entries

use std::path::Path;

use serde::Deserialize;

use crate::domain::credential::{validate_secret, Credential};
use crate::domain::denylist::{normalize_hash_value, DenylistEntry, DenylistRepository};
use crate::domain::DomainError;

/// Parsed seed file contents
#[derive(Debug, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub credentials: Vec<Credential>,
    #[serde(default)]
    pub entries: Vec<DenylistEntry>,
}

impl SeedData {
    /// Parse seed JSON, validating secrets and normalizing hash values
    pub fn parse(json: &str, hash_length: usize) -> Result<Self, DomainError> {
        let mut seed: SeedData = serde_json::from_str(json)
            .map_err(|e| DomainError::configuration(format!("Invalid seed file: {}", e)))?;

        for credential in &seed.credentials {
            validate_secret(credential.secret()).map_err(|e| {
                DomainError::configuration(format!(
                    "Seed credential '{}': {}",
                    credential.api_key(),
                    e
                ))
            })?;
        }

        for entry in &mut seed.entries {
            entry.hash_value = normalize_hash_value(&entry.hash_value, hash_length).map_err(|e| {
                DomainError::configuration(format!("Seed entry for '{}': {}", entry.tenant_id, e))
            })?;
        }

        Ok(seed)
    }

    pub async fn load(path: impl AsRef<Path>, hash_length: usize) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            DomainError::configuration(format!(
                "Failed to read seed file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::parse(&json, hash_length)
    }

    /// Create the seed entries in a persistent repository
    ///
    /// Entries that are already active count as present, so seeding the same
    /// file on every start is a no-op. Returns the number of new entries.
    pub async fn insert_entries(
        &self,
        repository: &dyn DenylistRepository,
    ) -> Result<usize, DomainError> {
        let mut created = 0;
        for entry in &self.entries {
            match repository.create(entry.clone()).await {
                Ok(_) => created += 1,
                Err(DomainError::Conflict { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(created)
    }
}
