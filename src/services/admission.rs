//! Token-bucket admission gate for the intake routes.
//!
//! Holds `rate` tokens that refill over `interval`. A denied request is
//! rejected on the spot; nothing is queued.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Bucket {
    tokens: u32,
    last_refill: Instant,
}

#[derive(Debug)]
pub struct AdmissionGate {
    rate: u32,
    interval: Duration,
    bucket: Mutex<Bucket>,
}

impl AdmissionGate {
    pub fn new(rate: u32, interval: Duration) -> Self {
        Self {
            rate,
            interval,
            bucket: Mutex::new(Bucket {
                tokens: rate,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Consume one token if one is available.
    pub fn allow(&self) -> bool {
        let mut bucket = self.bucket.lock();
        self.refill(&mut bucket, Instant::now());
        if bucket.tokens > 0 {
            bucket.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Tokens currently available, after applying any pending refill.
    pub fn remaining(&self) -> u32 {
        let mut bucket = self.bucket.lock();
        self.refill(&mut bucket, Instant::now());
        bucket.tokens
    }

    /// Time until the bucket is guaranteed to be full again.
    pub fn reset_in(&self) -> Duration {
        let bucket = self.bucket.lock();
        self.interval.saturating_sub(bucket.last_refill.elapsed())
    }

    /// Full reset once a whole interval has passed, otherwise a proportional
    /// top-up. `last_refill` only advances when at least one token was added
    /// so that frequent callers cannot starve the fractional remainder.
    fn refill(&self, bucket: &mut Bucket, now: Instant) {
        let elapsed = now.saturating_duration_since(bucket.last_refill);
        if elapsed >= self.interval {
            bucket.tokens = self.rate;
            bucket.last_refill = now;
        } else if !elapsed.is_zero() {
            let earned = (elapsed.as_secs_f64() / self.interval.as_secs_f64()
                * f64::from(self.rate)) as u32;
            if earned > 0 {
                bucket.tokens = bucket.tokens.saturating_add(earned).min(self.rate);
                bucket.last_refill = now;
            }
        }
    }
}
