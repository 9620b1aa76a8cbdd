//! Shared storage counters.

use crate::models::{media::MediaKind, stats::Stats};
use chrono::Utc;
use parking_lot::Mutex;

/// Counters bumped on every successful local write.
///
/// Critical sections are a handful of additions; nothing here does I/O
/// while holding the lock.
#[derive(Debug)]
pub struct StatsAggregator {
    inner: Mutex<Stats>,
}

impl StatsAggregator {
    /// Start counting from now.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Stats::new(Utc::now())),
        }
    }

    pub fn record(&self, kind: MediaKind, bytes: u64) {
        let mut stats = self.inner.lock();
        stats.total_bytes += bytes;
        match kind {
            MediaKind::Image => stats.image_count += 1,
            MediaKind::Video => stats.video_count += 1,
            MediaKind::Audio => stats.audio_count += 1,
            MediaKind::File => stats.file_count += 1,
        }
    }

    pub fn snapshot(&self) -> Stats {
        *self.inner.lock()
    }
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new()
    }
}
