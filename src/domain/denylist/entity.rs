//! Denylist entry entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::tenant::TenantId;

/// Canonical record of a denylisted subject
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenylistEntry {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub tenant_id: TenantId,
    /// Lowercase hex digest of the subject
    pub hash_value: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub operator_id: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl DenylistEntry {
    /// Create an active entry; `hash_value` must already be normalized
    pub fn new(tenant_id: TenantId, hash_value: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            hash_value: hash_value.into(),
            source: String::new(),
            reason: String::new(),
            operator_id: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn with_operator(mut self, operator_id: impl Into<String>) -> Self {
        self.operator_id = Some(operator_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_is_active() {
        let entry = DenylistEntry::new(TenantId::new("acme").unwrap(), "ab".repeat(16))
            .with_source("import")
            .with_reason("fraud")
            .with_operator("op-7");

        assert!(entry.is_active);
        assert_eq!(entry.source, "import");
        assert_eq!(entry.operator_id.as_deref(), Some("op-7"));
    }

    #[test]
    fn test_deserialize_defaults() {
        let json = r#"{"tenant_id": "acme", "hash_value": "00112233445566778899aabbccddeeff"}"#;
        let entry: DenylistEntry = serde_json::from_str(json).unwrap();

        assert!(entry.is_active);
        assert!(entry.source.is_empty());
        assert!(entry.operator_id.is_none());
    }
}
