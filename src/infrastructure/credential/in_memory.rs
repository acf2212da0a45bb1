//! In-memory credential directory

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::credential::{ApiKey, Credential, CredentialDirectory};
use crate::domain::DomainError;

/// Credential directory held in process memory, used for tests and seeded demos
#[derive(Debug, Default)]
pub struct InMemoryCredentialDirectory {
    credentials: Arc<RwLock<HashMap<ApiKey, Credential>>>,
}

impl InMemoryCredentialDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: Vec<Credential>) -> Self {
        let map = credentials
            .into_iter()
            .map(|c| (c.api_key().clone(), c))
            .collect();

        Self {
            credentials: Arc::new(RwLock::new(map)),
        }
    }
}

#[async_trait]
impl CredentialDirectory for InMemoryCredentialDirectory {
    async fn get(&self, api_key: &ApiKey) -> Result<Option<Credential>, DomainError> {
        Ok(self.credentials.read().await.get(api_key).cloned())
    }

    async fn touch_last_used(&self, api_key: &ApiKey, at: DateTime<Utc>) -> Result<(), DomainError> {
        let mut credentials = self.credentials.write().await;

        match credentials.get_mut(api_key) {
            Some(credential) => {
                credential.record_usage(at);
                Ok(())
            }
            None => Err(DomainError::not_found(format!(
                "Credential '{}' not found",
                api_key
            ))),
        }
    }

    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tenant::TenantId;

    fn credential(key: &str) -> Credential {
        Credential::new(
            ApiKey::new(key).unwrap(),
            "0123456789abcdef",
            TenantId::new("acme").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_get() {
        let directory = InMemoryCredentialDirectory::with_credentials(vec![credential("ak-1")]);

        let found = directory.get(&ApiKey::new("ak-1").unwrap()).await.unwrap();
        assert!(found.is_some());

        let missing = directory.get(&ApiKey::new("ak-2").unwrap()).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_touch_last_used() {
        let directory = InMemoryCredentialDirectory::with_credentials(vec![credential("ak-1")]);

        let key = ApiKey::new("ak-1").unwrap();
        let at = Utc::now();
        directory.touch_last_used(&key, at).await.unwrap();

        let stored = directory.get(&key).await.unwrap().unwrap();
        assert_eq!(stored.last_used_at(), Some(at));
    }

    #[tokio::test]
    async fn test_touch_unknown_key() {
        let directory = InMemoryCredentialDirectory::new();
        let result = directory
            .touch_last_used(&ApiKey::new("nope").unwrap(), Utc::now())
            .await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }
}
