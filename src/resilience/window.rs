//! Rolling outcome window for the circuit breaker.
//!
//! The window is a ring of at most `num_buckets` time buckets, each spanning
//! `window / num_buckets`. Buckets that fall entirely outside the window are
//! evicted lazily whenever the window is read or written.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Aggregated statistics over the live part of the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CircuitMetrics {
    pub total_count: u64,
    pub error_count: u64,
    /// Integer percentage, rounded down. Zero when there is no traffic.
    pub error_percentage: u32,
}

#[derive(Debug, Clone)]
struct Bucket {
    start: Instant,
    successes: u64,
    failures: u64,
}

impl Bucket {
    fn new(start: Instant) -> Self {
        Self {
            start,
            successes: 0,
            failures: 0,
        }
    }
}

/// Fixed-size, time-bucketed success/failure counter.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    window: Duration,
    bucket_duration: Duration,
    num_buckets: usize,
    buckets: VecDeque<Bucket>,
}

impl RollingWindow {
    /// Create a window of `window` length sliced into `num_buckets` buckets.
    ///
    /// A bucket count of zero is treated as one.
    pub fn new(window: Duration, num_buckets: u32) -> Self {
        let num_buckets = num_buckets.max(1);
        Self {
            window,
            bucket_duration: window / num_buckets,
            num_buckets: num_buckets as usize,
            buckets: VecDeque::with_capacity(num_buckets as usize),
        }
    }

    /// Length of the whole window.
    pub fn duration(&self) -> Duration {
        self.window
    }

    /// Record one attempt outcome at `now`.
    pub fn record(&mut self, now: Instant, success: bool) {
        let bucket = self.current_bucket(now);
        if success {
            bucket.successes += 1;
        } else {
            bucket.failures += 1;
        }
    }

    /// Statistics over the buckets still inside the window at `now`.
    pub fn metrics(&mut self, now: Instant) -> CircuitMetrics {
        self.evict(now);
        let (successes, failures) = self
            .buckets
            .iter()
            .fold((0u64, 0u64), |(s, f), b| (s + b.successes, f + b.failures));
        let total = successes + failures;
        let error_percentage = if total == 0 {
            0
        } else {
            (failures * 100 / total) as u32
        };
        CircuitMetrics {
            total_count: total,
            error_count: failures,
            error_percentage,
        }
    }

    /// Forget every recorded outcome.
    pub fn reset(&mut self) {
        self.buckets.clear();
    }

    fn evict(&mut self, now: Instant) {
        while let Some(front) = self.buckets.front() {
            if now.duration_since(front.start) >= self.window {
                self.buckets.pop_front();
            } else {
                break;
            }
        }
    }

    fn current_bucket(&mut self, now: Instant) -> &mut Bucket {
        self.evict(now);
        let stale = match self.buckets.back() {
            Some(last) => now.duration_since(last.start) >= self.bucket_duration,
            None => true,
        };
        if stale {
            if self.buckets.len() == self.num_buckets {
                self.buckets.pop_front();
            }
            self.buckets.push_back(Bucket::new(now));
        }
        // A bucket was just ensured above.
        let last = self.buckets.len() - 1;
        &mut self.buckets[last]
    }
}
