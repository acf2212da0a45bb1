//! Blacklist check pipeline
//!
//! authenticate → allow-list → rate limit → body validation → membership.
//! Statistics and audit entries are handed to the background dispatcher
//! once the handler knows the response status.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::clock::SharedClock;
use crate::domain::credential::Credential;
use crate::domain::denylist::normalize_hash_value;
use crate::domain::gateway::{
    duration_ms, AuditEntry, CheckOutcome, CheckRecord, GatewayError, RequestContext,
    SignedRequest, ValidationKind,
};
use crate::domain::DomainError;
use crate::infrastructure::observability::{record_auth_failure, record_check};

use super::allow_list::AllowList;
use super::authenticator::SignatureAuthenticator;
use super::dispatcher::{BackgroundDispatcher, BackgroundJob};
use super::membership::MembershipCache;
use super::rate_limiter::{RateLimitResult, RateLimiter};
use super::sampling::SamplingPolicy;

pub const CHECK_ENDPOINT: &str = "check";
pub const BATCH_CHECK_ENDPOINT: &str = "check_batch";

/// Body validation settings
#[derive(Debug, Clone)]
pub struct CheckConfig {
    pub hash_length: usize,
    pub max_batch_size: usize,
    /// Bound on rate-limit and membership cache calls
    pub operation_timeout: Duration,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            hash_length: 32,
            max_batch_size: 100,
            operation_timeout: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub hash_value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResponse {
    pub is_blacklisted: bool,
    pub hash_value: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchCheckRequest {
    pub hash_value_list: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchCheckResponse {
    pub results: Vec<CheckResponse>,
    pub total: usize,
    pub matched: usize,
    pub aggregate_hit: bool,
}

/// A successful check with the rate-limit state the response should advertise
#[derive(Debug, Clone)]
pub struct Checked<T> {
    pub body: T,
    pub outcome: CheckOutcome,
    pub rate_limit: RateLimitResult,
}

/// A batch counts as a hit when more than half of its members matched
pub fn aggregate_hit(matched: usize, total: usize) -> bool {
    matched * 2 > total
}

#[derive(Debug, Clone)]
pub struct BlacklistService {
    authenticator: SignatureAuthenticator,
    rate_limiter: RateLimiter,
    membership: MembershipCache,
    sampling: SamplingPolicy,
    dispatcher: BackgroundDispatcher,
    clock: SharedClock,
    config: CheckConfig,
}

impl BlacklistService {
    pub fn new(
        authenticator: SignatureAuthenticator,
        rate_limiter: RateLimiter,
        membership: MembershipCache,
        sampling: SamplingPolicy,
        dispatcher: BackgroundDispatcher,
        clock: SharedClock,
        config: CheckConfig,
    ) -> Self {
        Self {
            authenticator,
            rate_limiter,
            membership,
            sampling,
            dispatcher,
            clock,
            config,
        }
    }

    pub fn dispatcher(&self) -> &BackgroundDispatcher {
        &self.dispatcher
    }

    /// Normalize a list of hash values, reporting the first invalid index
    pub fn normalize_hashes(&self, raw: &[String]) -> Result<Vec<String>, GatewayError> {
        raw.iter()
            .enumerate()
            .map(|(index, value)| {
                normalize_hash_value(value, self.config.hash_length).map_err(|e| {
                    GatewayError::validation(
                        ValidationKind::InvalidHash,
                        format!("hash_value_list[{}]: {}", index, e),
                    )
                })
            })
            .collect()
    }

    /// Check a single hash
    pub async fn check(
        &self,
        ctx: &mut RequestContext,
        request: &SignedRequest,
    ) -> Result<Checked<CheckResponse>, GatewayError> {
        let (credential, rate_limit) = self.admit(ctx, request).await?;

        let body: CheckRequest = parse_body(&request.body)?;
        let hash_value = normalize_hash_value(&body.hash_value, self.config.hash_length)
            .map_err(|e| GatewayError::validation(ValidationKind::InvalidHash, e.to_string()))?;

        let is_blacklisted = self
            .bounded(self.membership.contains(credential.tenant_id(), &hash_value))
            .await?;

        Ok(Checked {
            body: CheckResponse {
                is_blacklisted,
                hash_value,
            },
            outcome: CheckOutcome {
                hash_count: 1,
                matched: usize::from(is_blacklisted),
                hit: is_blacklisted,
            },
            rate_limit,
        })
    }

    /// Check a bounded list of hashes in one round trip to the cache
    pub async fn check_batch(
        &self,
        ctx: &mut RequestContext,
        request: &SignedRequest,
    ) -> Result<Checked<BatchCheckResponse>, GatewayError> {
        let (credential, rate_limit) = self.admit(ctx, request).await?;

        let body: BatchCheckRequest = parse_body(&request.body)?;
        let total = body.hash_value_list.len();
        if total == 0 || total > self.config.max_batch_size {
            return Err(GatewayError::validation(
                ValidationKind::BatchSize,
                format!(
                    "hash_value_list must contain between 1 and {} values, got {}",
                    self.config.max_batch_size, total
                ),
            ));
        }

        let hashes = self.normalize_hashes(&body.hash_value_list)?;

        let found = self
            .bounded(self.membership.contains_many(credential.tenant_id(), &hashes))
            .await?;

        let results: Vec<CheckResponse> = hashes
            .into_iter()
            .zip(found)
            .map(|(hash_value, is_blacklisted)| CheckResponse {
                is_blacklisted,
                hash_value,
            })
            .collect();
        let matched = results.iter().filter(|r| r.is_blacklisted).count();
        let hit = aggregate_hit(matched, total);

        Ok(Checked {
            body: BatchCheckResponse {
                results,
                total,
                matched,
                aggregate_hit: hit,
            },
            outcome: CheckOutcome {
                hash_count: total,
                matched,
                hit,
            },
            rate_limit,
        })
    }

    /// Report the finished request: statistics for checks that ran, and an
    /// audit entry when the sampling policy asks for one
    pub fn complete(
        &self,
        ctx: &RequestContext,
        status: u16,
        outcome: Option<CheckOutcome>,
        error_code: Option<&'static str>,
    ) {
        let duration = ctx.elapsed();

        if self.sampling.is_slow(duration) {
            tracing::warn!(
                request_id = %ctx.request_id,
                endpoint = ctx.endpoint,
                tenant_id = ctx.tenant_id.as_ref().map(|t| t.as_str()),
                duration_ms = duration_ms(duration),
                "Slow blacklist query"
            );
        }

        match (outcome, &ctx.tenant_id, &ctx.api_key) {
            (Some(outcome), Some(tenant_id), Some(api_key)) => {
                record_check(if outcome.hit { "hit" } else { "miss" });
                let _ = self.dispatcher.submit(BackgroundJob::Stats(CheckRecord {
                    tenant_id: tenant_id.clone(),
                    api_key: api_key.clone(),
                    hit: outcome.hit,
                    latency_ms: duration_ms(duration),
                    at: self.clock.now(),
                }));
            }
            _ => record_check("error"),
        }

        if let Some(reason) = self.sampling.decide(status, ctx.auth_latency, duration) {
            let outcome = outcome.unwrap_or_default();
            let entry = AuditEntry {
                request_id: ctx.request_id,
                endpoint: ctx.endpoint,
                tenant_id: ctx.tenant_id.clone(),
                api_key: ctx.api_key.clone(),
                client_ip: ctx.client_ip.map(|ip| ip.to_string()),
                hash_count: outcome.hash_count,
                matched: outcome.matched,
                status,
                error_code,
                auth_latency_ms: duration_ms(ctx.auth_latency),
                duration_ms: duration_ms(duration),
                reason,
                at: ctx.received_at,
            };
            let _ = self.dispatcher.submit(BackgroundJob::Audit(Box::new(entry)));
        }
    }

    /// Authentication, allow-list and rate limit
    async fn admit(
        &self,
        ctx: &mut RequestContext,
        request: &SignedRequest,
    ) -> Result<(Credential, RateLimitResult), GatewayError> {
        let started = std::time::Instant::now();
        let result = self.authenticator.authenticate(request).await;
        ctx.auth_latency = started.elapsed();

        let credential = match result {
            Ok(credential) => credential,
            Err(e) => {
                if let GatewayError::Auth(kind) = &e {
                    record_auth_failure(kind.code());
                    tracing::debug!(request_id = %ctx.request_id, reason = kind.code(), "Authentication failed");
                }
                return Err(e);
            }
        };

        ctx.api_key = Some(credential.api_key().to_string());
        ctx.tenant_id = Some(credential.tenant_id().clone());

        let _ = self.dispatcher.submit(BackgroundJob::TouchCredential {
            api_key: credential.api_key().clone(),
            at: self.clock.now(),
        });

        let allow_list = AllowList::parse(credential.ip_allow_list());
        if allow_list.is_restricted() {
            let permitted = ctx.client_ip.is_some_and(|ip| allow_list.permits(ip));
            if !permitted {
                return Err(GatewayError::IpNotAllowed {
                    ip: ctx
                        .client_ip
                        .map_or_else(|| "unknown".to_string(), |ip| ip.to_string()),
                });
            }
        }

        let rate_limit = self
            .bounded(
                self.rate_limiter
                    .check_and_record(credential.api_key().as_str(), credential.rate_limit()),
            )
            .await?;

        if !rate_limit.allowed {
            return Err(GatewayError::RateLimited {
                limit: rate_limit.limit,
                retry_after_secs: rate_limit.reset_in_seconds.max(1),
            });
        }

        Ok((credential, rate_limit))
    }

    async fn bounded<T>(
        &self,
        future: impl std::future::Future<Output = Result<T, DomainError>>,
    ) -> Result<T, GatewayError> {
        tokio::time::timeout(self.config.operation_timeout, future)
            .await
            .map_err(|_| DomainError::timeout("blacklist check"))?
            .map_err(GatewayError::from)
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, GatewayError> {
    serde_json::from_slice(body)
        .map_err(|e| GatewayError::validation(ValidationKind::InvalidBody, format!("Invalid JSON body: {}", e)))
}
