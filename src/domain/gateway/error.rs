//! Request pipeline error taxonomy

use thiserror::Error;

use crate::domain::DomainError;

/// Reasons a signed request fails authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// A required header is absent or empty
    MissingField(&'static str),
    /// A header is present but cannot be parsed
    MalformedField(&'static str),
    UnknownKey,
    CredentialInactive,
    BadSignature,
    StaleTimestamp,
    ReplayedNonce,
}

impl AuthErrorKind {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "missing_field",
            Self::MalformedField(_) => "malformed_field",
            Self::UnknownKey => "unknown_key",
            Self::CredentialInactive => "credential_inactive",
            Self::BadSignature => "bad_signature",
            Self::StaleTimestamp => "stale_timestamp",
            Self::ReplayedNonce => "replayed_nonce",
        }
    }

    /// Header the failure relates to, when there is one
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::MissingField(field) | Self::MalformedField(field) => Some(field),
            _ => None,
        }
    }
}

impl std::fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "Missing required header '{}'", field),
            Self::MalformedField(field) => write!(f, "Malformed header '{}'", field),
            Self::UnknownKey => write!(f, "Unknown API key"),
            Self::CredentialInactive => write!(f, "Credential is inactive or expired"),
            Self::BadSignature => write!(f, "Signature does not match"),
            Self::StaleTimestamp => write!(f, "Timestamp is outside the accepted window"),
            Self::ReplayedNonce => write!(f, "Nonce has already been used"),
        }
    }
}

/// Reasons a request body is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    InvalidBody,
    InvalidHash,
    BatchSize,
}

impl ValidationKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidBody => "invalid_body",
            Self::InvalidHash => "invalid_hash",
            Self::BatchSize => "batch_size",
        }
    }
}

/// Errors surfaced by the blacklist check pipeline
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Authentication failed: {0}")]
    Auth(AuthErrorKind),

    #[error("IP address {ip} is not allowed for this credential")]
    IpNotAllowed { ip: String },

    #[error("Rate limit of {limit} requests exceeded")]
    RateLimited { limit: u32, retry_after_secs: u64 },

    #[error("{message}")]
    Validation { kind: ValidationKind, message: String },

    /// Cache or store unavailable; the check fails closed
    #[error("Service unavailable: {0}")]
    Unavailable(DomainError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn auth(kind: AuthErrorKind) -> Self {
        Self::Auth(kind)
    }

    pub fn validation(kind: ValidationKind, message: impl Into<String>) -> Self {
        Self::Validation {
            kind,
            message: message.into(),
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Auth(kind) => kind.code(),
            Self::IpNotAllowed { .. } => "ip_not_allowed",
            Self::RateLimited { .. } => "rate_limited",
            Self::Validation { kind, .. } => kind.code(),
            Self::Unavailable(_) => "cache_unavailable",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl From<AuthErrorKind> for GatewayError {
    fn from(kind: AuthErrorKind) -> Self {
        Self::Auth(kind)
    }
}

impl From<DomainError> for GatewayError {
    fn from(error: DomainError) -> Self {
        if error.is_unavailable() {
            Self::Unavailable(error)
        } else {
            Self::Internal(error.to_string())
        }
    }
}
