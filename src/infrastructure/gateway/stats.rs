//! Metrics aggregator
//!
//! Minute buckets live in process memory per tenant. Hourly counters are
//! incremented in the shared cache so rollups cover every instance and
//! survive a restart.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use futures::future::try_join_all;
use tokio::sync::RwLock;

use crate::domain::cache::{Cache, CacheKeys};
use crate::domain::clock::SharedClock;
use crate::domain::gateway::CheckRecord;
use crate::domain::stats::{
    fields, hour_start, HourCounters, HourlyStats, MinuteRing, MinuteSeries,
};
use crate::domain::tenant::TenantId;
use crate::domain::DomainError;

pub const MAX_HOURS: u32 = 168;
pub const MAX_MINUTES: u32 = 60;

/// Aggregator settings
#[derive(Debug, Clone)]
pub struct StatsConfig {
    /// Minute buckets retained per tenant
    pub minute_buckets: usize,
    /// Hours an hourly counter is kept
    pub hour_retention: u32,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            minute_buckets: 60,
            hour_retention: MAX_HOURS,
        }
    }
}

#[derive(Debug)]
pub struct MetricsAggregator {
    cache: Arc<dyn Cache>,
    keys: CacheKeys,
    clock: SharedClock,
    config: StatsConfig,
    rings: RwLock<HashMap<TenantId, MinuteRing>>,
}

impl MetricsAggregator {
    pub fn new(cache: Arc<dyn Cache>, keys: CacheKeys, clock: SharedClock, config: StatsConfig) -> Self {
        Self {
            cache,
            keys,
            clock,
            config,
            rings: RwLock::new(HashMap::new()),
        }
    }

    /// Count one check
    ///
    /// The minute bucket is always updated; an error means only the shared
    /// hourly counters could not be written.
    pub async fn record(&self, record: &CheckRecord) -> Result<(), DomainError> {
        {
            let mut rings = self.rings.write().await;
            rings
                .entry(record.tenant_id.clone())
                .or_insert_with(|| MinuteRing::new(self.config.minute_buckets))
                .record(record.at, record.hit, record.latency_ms);
        }

        let hour = hour_start(record.at);
        let ttl = Duration::from_secs((u64::from(self.config.hour_retention) + 1) * 3600);
        let tenant = record.tenant_id.as_str();
        let latency_us = (record.latency_ms * 1000.0).round().max(0.0) as i64;
        let outcome = if record.hit { fields::HIT } else { fields::MISS };

        let updates = [(fields::TOTAL, 1), (outcome, 1), (fields::LATENCY_US, latency_us)];
        try_join_all(updates.into_iter().map(|(field, delta)| {
            let key = self.keys.hourly_stat(tenant, hour, field);
            async move { self.cache.increment_with_ttl(&key, delta, ttl).await }
        }))
        .await?;

        Ok(())
    }

    /// Rollup over the trailing `hours` hours, the current partial hour included
    pub async fn hourly_stats(&self, tenant_id: &TenantId, hours: u32) -> Result<HourlyStats, DomainError> {
        if !(1..=MAX_HOURS).contains(&hours) {
            return Err(DomainError::validation(format!(
                "hours must be between 1 and {}",
                MAX_HOURS
            )));
        }

        let now = self.clock.now();
        let current = hour_start(now);
        let hour_starts: Vec<_> = (0..i64::from(hours))
            .map(|offset| current - ChronoDuration::hours(offset))
            .collect();

        let per_hour = try_join_all(
            hour_starts
                .iter()
                .map(|hour| self.read_hour(tenant_id, *hour)),
        )
        .await?;

        let mut counters = HourCounters::default();
        for hour in per_hour {
            counters += hour;
        }

        let from = current - ChronoDuration::hours(i64::from(hours) - 1);
        Ok(HourlyStats::from_counters(tenant_id.clone(), hours, from, now, counters))
    }

    /// Dense per-minute series of the trailing `minutes` minutes, oldest first
    pub async fn minute_stats(&self, tenant_id: &TenantId, minutes: u32) -> Result<MinuteSeries, DomainError> {
        let max = MAX_MINUTES.min(self.config.minute_buckets as u32);
        if !(1..=max).contains(&minutes) {
            return Err(DomainError::validation(format!(
                "minutes must be between 1 and {}",
                max
            )));
        }

        let now = self.clock.now();
        let rings = self.rings.read().await;
        let series = match rings.get(tenant_id) {
            Some(ring) => ring.series(now, minutes as usize),
            None => MinuteRing::new(1).series(now, minutes as usize),
        };

        Ok(MinuteSeries {
            tenant_id: tenant_id.clone(),
            minutes,
            series,
        })
    }

    async fn read_hour(
        &self,
        tenant_id: &TenantId,
        hour: chrono::DateTime<chrono::Utc>,
    ) -> Result<HourCounters, DomainError> {
        let tenant = tenant_id.as_str();
        let (total, hit, miss, latency_us) = futures::try_join!(
            self.read_counter(self.keys.hourly_stat(tenant, hour, fields::TOTAL)),
            self.read_counter(self.keys.hourly_stat(tenant, hour, fields::HIT)),
            self.read_counter(self.keys.hourly_stat(tenant, hour, fields::MISS)),
            self.read_counter(self.keys.hourly_stat(tenant, hour, fields::LATENCY_US)),
        )?;

        Ok(HourCounters {
            total,
            hit,
            miss,
            latency_us,
        })
    }

    async fn read_counter(&self, key: String) -> Result<u64, DomainError> {
        match self.cache.get_raw(&key).await? {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map(|v| v.max(0) as u64)
                .map_err(|e| DomainError::cache(format!("Corrupt counter '{}': {}", key, e))),
            None => Ok(0),
        }
    }
}
