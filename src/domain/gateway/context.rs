//! Per-request state threaded through the check pipeline

use std::net::IpAddr;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::tenant::TenantId;

/// Explicit request context passed from stage to stage
///
/// Filled in progressively: the extractor sets the client address, the
/// authenticator fills in the caller identity and its own latency, and the
/// handler reads the total duration when the response is ready.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub endpoint: &'static str,
    pub received_at: DateTime<Utc>,
    pub client_ip: Option<IpAddr>,
    pub api_key: Option<String>,
    pub tenant_id: Option<TenantId>,
    pub auth_latency: Duration,
    started: Instant,
}

impl RequestContext {
    pub fn new(endpoint: &'static str, received_at: DateTime<Utc>, client_ip: Option<IpAddr>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            endpoint,
            received_at,
            client_ip,
            api_key: None,
            tenant_id: None,
            auth_latency: Duration::ZERO,
            started: Instant::now(),
        }
    }

    /// Time since the request entered the pipeline
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Compact per-request record; every check produces exactly one
#[derive(Debug, Clone, PartialEq)]
pub struct CheckRecord {
    pub tenant_id: TenantId,
    pub api_key: String,
    pub hit: bool,
    pub latency_ms: f64,
    pub at: DateTime<Utc>,
}

/// Why a verbose audit entry was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditReason {
    Error,
    SlowAuth,
    SlowRequest,
    Sampled,
}

impl AuditReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::SlowAuth => "slow_auth",
            Self::SlowRequest => "slow_request",
            Self::Sampled => "sampled",
        }
    }
}

/// Verbose audit log entry for one request
#[derive(Debug, Clone, serde::Serialize)]
pub struct AuditEntry {
    pub request_id: Uuid,
    pub endpoint: &'static str,
    pub tenant_id: Option<TenantId>,
    pub api_key: Option<String>,
    pub client_ip: Option<String>,
    pub hash_count: usize,
    pub matched: usize,
    pub status: u16,
    pub error_code: Option<&'static str>,
    pub auth_latency_ms: f64,
    pub duration_ms: f64,
    pub reason: AuditReason,
    pub at: DateTime<Utc>,
}

/// Outcome summary the handler reports once the response status is known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckOutcome {
    pub hash_count: usize,
    pub matched: usize,
    pub hit: bool,
}

pub(crate) fn duration_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
