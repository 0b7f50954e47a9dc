//! Metrics collection and reporting for simulated forwarders.
//!
//! Counters are atomics so the topology layer can read them while the
//! forwarder keeps running; [`ForwarderMetrics::snapshot`] produces a plain
//! serializable copy for display.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/* ---------------------------------------------------------------- *
 * Counter and gauge
 * ---------------------------------------------------------------- */

/// Monotonic event count.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.add(1);
    }

    pub fn add(&self, value: u64) {
        self.0.fetch_add(value, Ordering::Relaxed);
    }

    pub fn value(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Current level of something that grows and shrinks (table sizes, packets in flight).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, value: u64) {
        self.0.store(value, Ordering::Relaxed);
    }

    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Saturates at zero.
    pub fn decrement(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)));
    }

    pub fn value(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

// Cloning copies the current reading into an independent cell.
impl Clone for Counter {
    fn clone(&self) -> Self {
        Self(AtomicU64::new(self.value()))
    }
}

impl Clone for Gauge {
    fn clone(&self) -> Self {
        Self(AtomicU64::new(self.value()))
    }
}

/* ---------------------------------------------------------------- *
 * Latency histogram
 * ---------------------------------------------------------------- */

/// Upper bounds (inclusive, in microseconds) of the RTT buckets.
const RTT_BOUNDS_US: [u64; 12] = [
    500, 1_000, 2_000, 5_000, 10_000, 20_000, 50_000, 100_000, 200_000, 500_000, 1_000_000, 4_000_000,
];

/// Bucketed distribution of observed values.
///
/// Values above the last bound land in a trailing overflow bucket, so
/// `buckets()` always has one more entry than there are bounds.
#[derive(Debug)]
pub struct Histogram {
    bounds: Vec<u64>,
    buckets: Vec<AtomicU64>,
    sum: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    pub fn new(mut bounds: Vec<u64>) -> Self {
        bounds.sort_unstable();
        bounds.dedup();
        let buckets = (0..=bounds.len()).map(|_| AtomicU64::new(0)).collect();
        Self {
            bounds,
            buckets,
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, value: u64) {
        let idx = self.bounds.partition_point(|&bound| bound < value);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
        self.sum.fetch_add(value, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn average(&self) -> f64 {
        match self.count() {
            0 => 0.0,
            n => self.sum() as f64 / n as f64,
        }
    }

    /// `(upper bound, count)` per bucket; the overflow bucket reports `u64::MAX`.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        self.bounds
            .iter()
            .copied()
            .chain(std::iter::once(u64::MAX))
            .zip(&self.buckets)
            .map(|(bound, n)| (bound, n.load(Ordering::Relaxed)))
            .collect()
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new(RTT_BOUNDS_US.to_vec())
    }
}

impl Clone for Histogram {
    fn clone(&self) -> Self {
        Self {
            bounds: self.bounds.clone(),
            buckets: self.buckets.iter().map(|b| AtomicU64::new(b.load(Ordering::Relaxed))).collect(),
            sum: AtomicU64::new(self.sum()),
            count: AtomicU64::new(self.count()),
        }
    }
}

/* ---------------------------------------------------------------- *
 * Aggregate metrics for one forwarder
 * ---------------------------------------------------------------- */

#[derive(Debug, Default, Clone)]
pub struct ForwarderMetrics {
    // Packet processing metrics
    pub interests_received: Counter,
    pub interests_forwarded: Counter,
    pub interests_aggregated: Counter,
    pub interests_looped: Counter,
    pub interests_satisfied: Counter,
    pub interests_timed_out: Counter,
    /// Interests expressed by local consumers
    pub interests_expressed: Counter,
    pub data_received: Counter,
    pub data_sent: Counter,
    pub data_unsolicited: Counter,
    pub nacks_received: Counter,
    pub nacks_sent: Counter,

    // Cache metrics
    pub cs_hits: Counter,
    pub cs_misses: Counter,
    pub cs_inserts: Counter,
    pub cs_evictions: Counter,
    pub cs_size: Gauge,

    // PIT metrics
    pub pit_inserts: Counter,
    pub pit_expirations: Counter,
    pub pit_size: Gauge,

    // FIB metrics
    pub fib_misses: Counter,

    /// Round trip of locally expressed Interests, in microseconds
    pub interest_rtt: Histogram,

    // Transport metrics
    pub packets_received: Counter,
    pub packets_sent: Counter,
    pub bytes_received: Counter,
    pub bytes_sent: Counter,
}

impl ForwarderMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies the current values into a serializable snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            interests_received: self.interests_received.value(),
            interests_forwarded: self.interests_forwarded.value(),
            interests_aggregated: self.interests_aggregated.value(),
            interests_looped: self.interests_looped.value(),
            interests_satisfied: self.interests_satisfied.value(),
            interests_timed_out: self.interests_timed_out.value(),
            data_received: self.data_received.value(),
            data_sent: self.data_sent.value(),
            nacks_received: self.nacks_received.value(),
            nacks_sent: self.nacks_sent.value(),
            cs_hits: self.cs_hits.value(),
            cs_misses: self.cs_misses.value(),
            cs_size: self.cs_size.value(),
            pit_size: self.pit_size.value(),
            packets_received: self.packets_received.value(),
            packets_sent: self.packets_sent.value(),
            bytes_received: self.bytes_received.value(),
            bytes_sent: self.bytes_sent.value(),
            avg_rtt_us: self.interest_rtt.average(),
        }
    }
}

/// Point-in-time copy of [`ForwarderMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub interests_received: u64,
    pub interests_forwarded: u64,
    pub interests_aggregated: u64,
    pub interests_looped: u64,
    pub interests_satisfied: u64,
    pub interests_timed_out: u64,
    pub data_received: u64,
    pub data_sent: u64,
    pub nacks_received: u64,
    pub nacks_sent: u64,
    pub cs_hits: u64,
    pub cs_misses: u64,
    pub cs_size: u64,
    pub pit_size: u64,
    pub packets_received: u64,
    pub packets_sent: u64,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub avg_rtt_us: f64,
}
