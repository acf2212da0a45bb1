//! Tenant identifier

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

const MAX_TENANT_ID_LENGTH: usize = 64;

/// Tenant identifier - alphanumeric plus `-` and `_`, max 64 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();

        if id.is_empty() {
            return Err(DomainError::validation("Tenant ID cannot be empty"));
        }

        if id.len() > MAX_TENANT_ID_LENGTH {
            return Err(DomainError::validation(format!(
                "Tenant ID exceeds maximum length of {} characters",
                MAX_TENANT_ID_LENGTH
            )));
        }

        if let Some(c) = id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(DomainError::validation(format!(
                "Tenant ID contains invalid character: '{}'",
                c
            )));
        }

        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TenantId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_tenant_ids() {
        assert!(TenantId::new("acme").is_ok());
        assert!(TenantId::new("tenant_01").is_ok());
        assert!(TenantId::new("EU-west-2").is_ok());
    }

    #[test]
    fn test_invalid_tenant_ids() {
        assert!(TenantId::new("").is_err());
        assert!(TenantId::new("a:b").is_err());
        assert!(TenantId::new("a b").is_err());
        assert!(TenantId::new("x".repeat(65)).is_err());
    }

    #[test]
    fn test_tenant_id_deserialization_validates() {
        let ok: Result<TenantId, _> = serde_json::from_str("\"acme\"");
        assert!(ok.is_ok());

        let bad: Result<TenantId, _> = serde_json::from_str("\"bad:id\"");
        assert!(bad.is_err());
    }
}
