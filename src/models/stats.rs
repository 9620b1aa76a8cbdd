//! Point-in-time copies of the pipeline counters.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Snapshot of local storage activity since the store was created.
///
/// Always a value copy; the live aggregate never leaves `StatsAggregator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub image_count: u64,
    pub video_count: u64,
    pub audio_count: u64,
    pub file_count: u64,
    pub total_bytes: u64,
    pub start_time: DateTime<Utc>,
}

/// Throughput derived from a [`Stats`] snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rates {
    pub items_per_minute: f64,
    pub bytes_per_minute: f64,
}

impl Stats {
    pub fn new(start_time: DateTime<Utc>) -> Self {
        Self {
            image_count: 0,
            video_count: 0,
            audio_count: 0,
            file_count: 0,
            total_bytes: 0,
            start_time,
        }
    }

    pub fn total_items(&self) -> u64 {
        self.image_count + self.video_count + self.audio_count + self.file_count
    }

    /// Divide totals by wall-clock minutes since `start_time`.
    ///
    /// A zero (or negative, after a clock step) elapsed time yields zero rates.
    pub fn rates_at(&self, now: DateTime<Utc>) -> Rates {
        let elapsed_ms = (now - self.start_time).num_milliseconds();
        if elapsed_ms <= 0 {
            return Rates {
                items_per_minute: 0.0,
                bytes_per_minute: 0.0,
            };
        }
        let minutes = elapsed_ms as f64 / 60_000.0;
        Rates {
            items_per_minute: self.total_items() as f64 / minutes,
            bytes_per_minute: self.total_bytes as f64 / minutes,
        }
    }
}
