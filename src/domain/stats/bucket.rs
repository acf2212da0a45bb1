//! Minute buckets and the bounded ring that holds them

use std::collections::VecDeque;

use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::Serialize;

/// Truncate a timestamp to the start of its minute
pub fn minute_start(at: DateTime<Utc>) -> DateTime<Utc> {
    at.duration_trunc(Duration::minutes(1)).unwrap_or(at)
}

/// Truncate a timestamp to the start of its hour
pub fn hour_start(at: DateTime<Utc>) -> DateTime<Utc> {
    at.duration_trunc(Duration::hours(1)).unwrap_or(at)
}

/// Counters for one tenant over one minute
#[derive(Debug, Clone, PartialEq)]
pub struct MinuteBucket {
    pub minute: DateTime<Utc>,
    pub total: u64,
    pub hit: u64,
    pub miss: u64,
    pub latency_sum_ms: f64,
}

impl MinuteBucket {
    pub fn new(minute: DateTime<Utc>) -> Self {
        Self {
            minute,
            total: 0,
            hit: 0,
            miss: 0,
            latency_sum_ms: 0.0,
        }
    }

    pub fn record(&mut self, hit: bool, latency_ms: f64) {
        self.total += 1;
        if hit {
            self.hit += 1;
        } else {
            self.miss += 1;
        }
        self.latency_sum_ms += latency_ms;
    }
}

/// Most recent minute buckets of a tenant, oldest first
///
/// Holds at most `capacity` buckets; appending past that evicts the oldest.
#[derive(Debug, Clone)]
pub struct MinuteRing {
    capacity: usize,
    buckets: VecDeque<MinuteBucket>,
}

impl MinuteRing {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            buckets: VecDeque::with_capacity(capacity),
        }
    }

    /// Add one check to the bucket of the minute containing `at`
    ///
    /// Records can arrive slightly out of order from the background workers;
    /// they land in their own minute as long as it is still retained.
    pub fn record(&mut self, at: DateTime<Utc>, hit: bool, latency_ms: f64) {
        let minute = minute_start(at);

        let is_late = self.buckets.back().is_some_and(|last| minute <= last.minute);
        if is_late {
            self.record_late(minute, hit, latency_ms);
            return;
        }

        let mut bucket = MinuteBucket::new(minute);
        bucket.record(hit, latency_ms);
        self.buckets.push_back(bucket);
        self.evict();
    }

    fn record_late(&mut self, minute: DateTime<Utc>, hit: bool, latency_ms: f64) {
        if let Some(bucket) = self.buckets.iter_mut().rev().find(|b| b.minute == minute) {
            bucket.record(hit, latency_ms);
            return;
        }

        // Older than everything retained in a full ring
        let full = self.buckets.len() >= self.capacity;
        if full && self.buckets.front().is_some_and(|first| minute < first.minute) {
            return;
        }

        let position = self
            .buckets
            .iter()
            .position(|b| b.minute > minute)
            .unwrap_or(self.buckets.len());
        let mut bucket = MinuteBucket::new(minute);
        bucket.record(hit, latency_ms);
        self.buckets.insert(position, bucket);
        self.evict();
    }

    fn evict(&mut self) {
        while self.buckets.len() > self.capacity {
            self.buckets.pop_front();
        }
    }

    pub fn bucket(&self, minute: DateTime<Utc>) -> Option<&MinuteBucket> {
        let minute = minute_start(minute);
        self.buckets.iter().rev().find(|b| b.minute == minute)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Dense series of the last `minutes` minutes ending at the minute of `now`,
    /// oldest first, zero-filled where no bucket exists
    pub fn series(&self, now: DateTime<Utc>, minutes: usize) -> Vec<MinuteStat> {
        let current = minute_start(now);

        (0..minutes as i64)
            .rev()
            .map(|offset| {
                let minute = current - Duration::minutes(offset);
                match self.bucket(minute) {
                    Some(bucket) => MinuteStat::from_bucket(bucket),
                    None => MinuteStat::from_bucket(&MinuteBucket::new(minute)),
                }
            })
            .collect()
    }
}

/// One point of a minute series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MinuteStat {
    pub minute: DateTime<Utc>,
    pub total_queries: u64,
    pub hit_count: u64,
    pub miss_count: u64,
    pub hit_rate: f64,
    pub qps: f64,
    pub avg_latency_ms: f64,
}

impl MinuteStat {
    pub fn from_bucket(bucket: &MinuteBucket) -> Self {
        Self {
            minute: bucket.minute,
            total_queries: bucket.total,
            hit_count: bucket.hit,
            miss_count: bucket.miss,
            hit_rate: ratio(bucket.hit as f64, bucket.total),
            qps: bucket.total as f64 / 60.0,
            avg_latency_ms: ratio(bucket.latency_sum_ms, bucket.total),
        }
    }
}

/// `numerator / total`, or 0 when nothing was counted
pub fn ratio(numerator: f64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        numerator / total as f64
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_minute_start_truncates() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 3, 59).unwrap();
        assert_eq!(minute_start(at), Utc.with_ymd_and_hms(2024, 5, 1, 12, 3, 0).unwrap());
        assert_eq!(hour_start(at), t0());
    }

    #[test]
    fn test_records_in_same_minute_share_a_bucket() {
        let mut ring = MinuteRing::new(60);
        ring.record(t0(), true, 2.0);
        ring.record(t0() + Duration::seconds(30), false, 4.0);

        assert_eq!(ring.len(), 1);
        let bucket = ring.bucket(t0()).unwrap();
        assert_eq!((bucket.total, bucket.hit, bucket.miss), (2, 1, 1));
        assert_eq!(bucket.latency_sum_ms, 6.0);
    }

    #[test]
    fn test_rollover_creates_new_bucket_and_evicts_oldest() {
        let mut ring = MinuteRing::new(3);
        for minute in 0..5 {
            ring.record(t0() + Duration::minutes(minute), true, 1.0);
        }

        assert_eq!(ring.len(), 3);
        assert!(ring.bucket(t0()).is_none());
        assert!(ring.bucket(t0() + Duration::minutes(1)).is_none());
        assert!(ring.bucket(t0() + Duration::minutes(2)).is_some());
        assert!(ring.bucket(t0() + Duration::minutes(4)).is_some());
    }

    #[test]
    fn test_late_record_lands_in_its_own_minute() {
        let mut ring = MinuteRing::new(60);
        ring.record(t0(), true, 1.0);
        ring.record(t0() + Duration::minutes(2), true, 1.0);
        ring.record(t0() + Duration::minutes(1), false, 1.0);
        ring.record(t0() + Duration::seconds(10), false, 1.0);

        assert_eq!(ring.len(), 3);
        assert_eq!(ring.bucket(t0()).unwrap().total, 2);
        assert_eq!(ring.bucket(t0() + Duration::minutes(1)).unwrap().miss, 1);
    }

    #[test]
    fn test_record_older_than_full_ring_is_dropped() {
        let mut ring = MinuteRing::new(2);
        ring.record(t0() + Duration::minutes(5), true, 1.0);
        ring.record(t0() + Duration::minutes(6), true, 1.0);
        ring.record(t0(), true, 1.0);

        assert_eq!(ring.len(), 2);
        assert!(ring.bucket(t0()).is_none());
    }

    #[test]
    fn test_series_is_dense_and_oldest_first() {
        let mut ring = MinuteRing::new(60);
        ring.record(t0() + Duration::minutes(4), true, 3.0);
        ring.record(t0() + Duration::minutes(4), false, 1.0);
        ring.record(t0() + Duration::minutes(2), false, 1.0);

        let series = ring.series(t0() + Duration::minutes(4) + Duration::seconds(20), 5);

        assert_eq!(series.len(), 5);
        assert_eq!(series[0].minute, t0());
        assert_eq!(series[4].minute, t0() + Duration::minutes(4));
        assert_eq!(series[1].total_queries, 0);
        assert_eq!(series[2].total_queries, 1);

        let current = &series[4];
        assert_eq!(current.total_queries, 2);
        assert_eq!(current.hit_rate, 0.5);
        assert_eq!(current.avg_latency_ms, 2.0);
        assert!((current.qps - 2.0 / 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_minute_has_zero_rates() {
        let stat = MinuteStat::from_bucket(&MinuteBucket::new(t0()));
        assert_eq!(stat.hit_rate, 0.0);
        assert_eq!(stat.avg_latency_ms, 0.0);
        assert_eq!(stat.qps, 0.0);
    }
}
