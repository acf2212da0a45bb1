//! Domain layer - Core entities, traits and errors of the gateway

pub mod cache;
pub mod clock;
pub mod credential;
pub mod denylist;
pub mod error;
pub mod gateway;
pub mod stats;
pub mod tenant;

pub use cache::{Cache, CacheExt, CacheKeys};
pub use clock::{system_clock, Clock, SharedClock, SystemClock};
pub use credential::{
    validate_api_key, validate_secret, ApiKey, Credential, CredentialDirectory, CredentialStatus,
    CredentialValidationError,
};
pub use denylist::{normalize_hash_value, DenylistEntry, DenylistRepository, HashValidationError};
pub use error::DomainError;
pub use gateway::{
    AuditEntry, AuditReason, AuthErrorKind, CheckOutcome, CheckRecord, GatewayError,
    RequestContext, SignedRequest, ValidationKind,
};
pub use stats::{HourlyStats, MinuteBucket, MinuteRing, MinuteSeries, MinuteStat};
pub use tenant::TenantId;
