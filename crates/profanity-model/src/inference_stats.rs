//! Latency of recent `predict` calls.
//!
//! [`InferenceStatsTracker`] keeps the last `capacity` durations behind a
//! mutex and summarises them on demand. The summary is exposed through
//! `ProfanityClassifier::latency_summary` and logged by the server when it
//! shuts down; nothing here affects scoring.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Default number of durations kept.
pub const DEFAULT_CAPACITY: usize = 512;

/// Summary over the retained window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InferenceStats {
    /// Calls recorded since creation, including evicted ones.
    pub total_calls: u64,
    /// Durations currently in the window.
    pub window: usize,
    /// Arithmetic mean of the window.
    pub mean: Duration,
    /// Median (nearest rank).
    pub p50: Duration,
    /// 95th percentile (nearest rank).
    pub p95: Duration,
    /// Slowest call in the window.
    pub max: Duration,
}

impl std::fmt::Display for InferenceStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "calls={} mean={:?} p50={:?} p95={:?} max={:?}",
            self.total_calls, self.mean, self.p50, self.p95, self.max
        )
    }
}

#[derive(Debug)]
struct Window {
    durations: VecDeque<Duration>,
    capacity: usize,
    total_calls: u64,
}

/// Thread-safe sliding window of inference durations.
#[derive(Debug)]
pub struct InferenceStatsTracker {
    inner: Mutex<Window>,
}

impl InferenceStatsTracker {
    /// Track at most `capacity` durations (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Window {
                durations: VecDeque::with_capacity(capacity),
                capacity,
                total_calls: 0,
            }),
        }
    }

    /// Record one call, evicting the oldest duration when full.
    pub fn record(&self, elapsed: Duration) {
        let mut w = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if w.durations.len() == w.capacity {
            w.durations.pop_front();
        }
        w.durations.push_back(elapsed);
        w.total_calls += 1;
    }

    /// Summarise the window, or `None` before the first call.
    #[must_use]
    pub fn stats(&self) -> Option<InferenceStats> {
        let w = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if w.durations.is_empty() {
            return None;
        }

        let mut sorted: Vec<Duration> = w.durations.iter().copied().collect();
        sorted.sort_unstable();
        let n = sorted.len();
        let mean = sorted.iter().sum::<Duration>() / n as u32;

        Some(InferenceStats {
            total_calls: w.total_calls,
            window: n,
            mean,
            p50: nearest_rank(&sorted, 0.50),
            p95: nearest_rank(&sorted, 0.95),
            max: sorted[n - 1],
        })
    }
}

impl Default for InferenceStatsTracker {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Nearest-rank percentile of a non-empty sorted slice, `q` in `[0, 1]`.
fn nearest_rank(sorted: &[Duration], q: f64) -> Duration {
    let rank = (q * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}
