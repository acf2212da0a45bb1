//! Statistics domain - minute buckets and hourly rollups

mod bucket;
mod summary;

pub use bucket::{hour_start, minute_start, ratio, MinuteBucket, MinuteRing, MinuteStat};
pub use summary::{fields, HourCounters, HourlyStats, MinuteSeries};
