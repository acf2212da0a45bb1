//! Rolled-up statistics over a trailing number of hours

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::bucket::{ratio, MinuteStat};
use crate::domain::tenant::TenantId;

/// Per-hour counter fields stored in the shared cache
pub mod fields {
    pub const TOTAL: &str = "total";
    pub const HIT: &str = "hit";
    pub const MISS: &str = "miss";
    /// Latency sum in microseconds, kept integral for atomic increments
    pub const LATENCY_US: &str = "latency_us";
}

/// Raw counters of one hour
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HourCounters {
    pub total: u64,
    pub hit: u64,
    pub miss: u64,
    pub latency_us: u64,
}

impl std::ops::AddAssign for HourCounters {
    fn add_assign(&mut self, other: Self) {
        self.total += other.total;
        self.hit += other.hit;
        self.miss += other.miss;
        self.latency_us += other.latency_us;
    }
}

/// Aggregated statistics over the last `hours` hours
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyStats {
    pub tenant_id: TenantId,
    pub hours: u32,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub total_queries: u64,
    pub hit_count: u64,
    pub miss_count: u64,
    pub hit_rate: f64,
    pub qps: f64,
    pub avg_latency_ms: f64,
}

impl HourlyStats {
    pub fn from_counters(
        tenant_id: TenantId,
        hours: u32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        counters: HourCounters,
    ) -> Self {
        Self {
            tenant_id,
            hours,
            from,
            to,
            total_queries: counters.total,
            hit_count: counters.hit,
            miss_count: counters.miss,
            hit_rate: ratio(counters.hit as f64, counters.total),
            qps: counters.total as f64 / (f64::from(hours) * 3600.0),
            avg_latency_ms: ratio(counters.latency_us as f64 / 1000.0, counters.total),
        }
    }
}

/// Minute series for a tenant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MinuteSeries {
    pub tenant_id: TenantId,
    pub minutes: u32,
    pub series: Vec<MinuteStat>,
}
