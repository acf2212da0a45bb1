//! Credential directory trait

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::entity::{ApiKey, Credential};
use crate::domain::DomainError;

/// Read path of the credential store used during request authentication
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialDirectory: Send + Sync + Debug {
    /// Resolve a credential by its public API key
    async fn get(&self, api_key: &ApiKey) -> Result<Option<Credential>, DomainError>;

    /// Record that the credential was used at `at`
    async fn touch_last_used(&self, api_key: &ApiKey, at: DateTime<Utc>)
        -> Result<(), DomainError>;

    /// Verify the directory is reachable
    async fn ping(&self) -> Result<(), DomainError>;
}
