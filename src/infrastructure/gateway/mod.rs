//! Blacklist gateway components

pub mod allow_list;
pub mod audit;
pub mod authenticator;
pub mod dispatcher;
pub mod membership;
pub mod rate_limiter;
pub mod sampling;
pub mod service;
pub mod signature;
pub mod stats;
pub mod sync;

pub use allow_list::AllowList;
pub use audit::{AuditSink, PostgresAuditSink, TracingAuditSink};
pub use authenticator::{AuthConfig, SignatureAuthenticator};
pub use dispatcher::{BackgroundDispatcher, BackgroundJob, DispatchError, DispatcherConfig, JobContext};
pub use membership::MembershipCache;
pub use rate_limiter::{RateLimitAlgorithm, RateLimitResult, RateLimiter};
pub use sampling::{SamplingConfig, SamplingPolicy};
pub use service::{
    BatchCheckResponse, BlacklistService, CheckConfig, CheckResponse, Checked,
    BATCH_CHECK_ENDPOINT, CHECK_ENDPOINT,
};
pub use stats::{MetricsAggregator, StatsConfig};
pub use sync::{CacheSyncEngine, SyncAllReport, SyncReport};
