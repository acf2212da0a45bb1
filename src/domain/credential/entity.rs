//! Credential entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{validate_api_key, CredentialValidationError};
use crate::domain::tenant::TenantId;

/// Public API key identifier sent in the `X-API-Key` header
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiKey(String);

impl ApiKey {
    /// Create a new ApiKey after validation
    pub fn new(key: impl Into<String>) -> Result<Self, CredentialValidationError> {
        let key = key.into();
        validate_api_key(&key)?;
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ApiKey {
    type Error = CredentialValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ApiKey> for String {
    fn from(key: ApiKey) -> Self {
        key.0
    }
}

impl std::fmt::Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    #[default]
    Active,
    Disabled,
    Suspended,
}

impl CredentialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Disabled => "disabled",
            Self::Suspended => "suspended",
        }
    }
}

impl std::str::FromStr for CredentialStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "disabled" => Ok(Self::Disabled),
            "suspended" => Ok(Self::Suspended),
            other => Err(format!("Unknown credential status: {}", other)),
        }
    }
}

/// Machine-to-machine credential used to sign blacklist requests
///
/// The secret is the HMAC key shared with the caller. It is never serialized
/// and is redacted from debug output.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    api_key: ApiKey,
    #[serde(skip_serializing)]
    secret: String,
    tenant_id: TenantId,
    /// Requests per rate-limit window; 0 disables the limit
    #[serde(default)]
    rate_limit: u32,
    /// Literal IPs or CIDR blocks; empty admits every address
    #[serde(default)]
    ip_allow_list: Vec<String>,
    #[serde(default)]
    status: CredentialStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_used_at: Option<DateTime<Utc>>,
    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("api_key", &self.api_key)
            .field("secret", &"[REDACTED]")
            .field("tenant_id", &self.tenant_id)
            .field("rate_limit", &self.rate_limit)
            .field("ip_allow_list", &self.ip_allow_list)
            .field("status", &self.status)
            .field("expires_at", &self.expires_at)
            .field("last_used_at", &self.last_used_at)
            .finish()
    }
}

impl Credential {
    /// Create a new active credential without a rate limit or allow-list
    pub fn new(api_key: ApiKey, secret: impl Into<String>, tenant_id: TenantId) -> Self {
        Self {
            api_key,
            secret: secret.into(),
            tenant_id,
            rate_limit: 0,
            ip_allow_list: Vec::new(),
            status: CredentialStatus::Active,
            expires_at: None,
            last_used_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_rate_limit(mut self, rate_limit: u32) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_ip_allow_list(mut self, entries: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.ip_allow_list = entries.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_status(mut self, status: CredentialStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_expiration(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_last_used_at(mut self, last_used_at: Option<DateTime<Utc>>) -> Self {
        self.last_used_at = last_used_at;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    // Getters

    pub fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn rate_limit(&self) -> u32 {
        self.rate_limit
    }

    pub fn ip_allow_list(&self) -> &[String] {
        &self.ip_allow_list
    }

    pub fn status(&self) -> CredentialStatus {
        self.status
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn last_used_at(&self) -> Option<DateTime<Utc>> {
        self.last_used_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether the credential is active and unexpired at `now`
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        if self.status != CredentialStatus::Active {
            return false;
        }

        match self.expires_at {
            Some(expires_at) => now <= expires_at,
            None => true,
        }
    }

    pub fn record_usage(&mut self, at: DateTime<Utc>) {
        self.last_used_at = Some(at);
    }
}
