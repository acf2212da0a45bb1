//! Audit sampling policy

use std::time::Duration;

use rand::Rng;

use crate::domain::gateway::AuditReason;

#[derive(Debug, Clone)]
pub struct SamplingConfig {
    /// Probability of auditing an otherwise unremarkable request
    pub sample_rate: f64,
    pub auth_latency_threshold: Duration,
    pub slow_request_threshold: Duration,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            sample_rate: 0.01,
            auth_latency_threshold: Duration::from_millis(50),
            slow_request_threshold: Duration::from_millis(100),
        }
    }
}

/// Decides which requests get a verbose audit entry
///
/// Errors, slow authentication and slow requests are always audited; the
/// rest are sampled. Statistics never depend on this decision.
#[derive(Debug, Clone)]
pub struct SamplingPolicy {
    sample_rate: f64,
    auth_latency_threshold: Duration,
    slow_request_threshold: Duration,
}

impl SamplingPolicy {
    pub fn new(config: SamplingConfig) -> Self {
        let sample_rate = if config.sample_rate.is_nan() {
            0.0
        } else {
            config.sample_rate.clamp(0.0, 1.0)
        };

        Self {
            sample_rate,
            auth_latency_threshold: config.auth_latency_threshold,
            slow_request_threshold: config.slow_request_threshold,
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn is_slow(&self, duration: Duration) -> bool {
        duration > self.slow_request_threshold
    }

    pub fn decide(&self, status: u16, auth_latency: Duration, duration: Duration) -> Option<AuditReason> {
        let roll = rand::thread_rng().gen_range(0.0..1.0);
        self.decide_with(status, auth_latency, duration, roll)
    }

    /// [`decide`](Self::decide) with the random draw supplied, `roll` in `[0, 1)`
    pub fn decide_with(
        &self,
        status: u16,
        auth_latency: Duration,
        duration: Duration,
        roll: f64,
    ) -> Option<AuditReason> {
        if status >= 400 {
            Some(AuditReason::Error)
        } else if auth_latency > self.auth_latency_threshold {
            Some(AuditReason::SlowAuth)
        } else if self.is_slow(duration) {
            Some(AuditReason::SlowRequest)
        } else if roll < self.sample_rate {
            Some(AuditReason::Sampled)
        } else {
            None
        }
    }
}
