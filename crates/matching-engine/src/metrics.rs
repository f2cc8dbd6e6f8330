//! Metrics for the Matching Engine
//!
//! Lock-free counters shared by every book behind an [`OrderBookManager`](crate::OrderBookManager).
//! All updates use relaxed atomics; a snapshot is not a consistent cut across
//! counters, only a cheap approximate view.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::result::QueuePriority;

/// Monotonic counter
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Up/down gauge
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    /// Saturates at zero
    pub fn sub(&self, n: u64) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(n)));
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Running min/max/mean of operation latency
#[derive(Debug)]
pub struct LatencyStats {
    count: AtomicU64,
    sum_ns: AtomicU64,
    min_ns: AtomicU64,
    max_ns: AtomicU64,
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self {
            count: AtomicU64::new(0),
            sum_ns: AtomicU64::new(0),
            min_ns: AtomicU64::new(u64::MAX),
            max_ns: AtomicU64::new(0),
        }
    }
}

impl LatencyStats {
    pub fn record(&self, elapsed: Duration) {
        let ns = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum_ns.fetch_add(ns, Ordering::Relaxed);
        self.min_ns.fetch_min(ns, Ordering::Relaxed);
        self.max_ns.fetch_max(ns, Ordering::Relaxed);
    }

    pub fn summary(&self) -> LatencySummary {
        let count = self.count.load(Ordering::Relaxed);
        let sum = self.sum_ns.load(Ordering::Relaxed);
        LatencySummary {
            count,
            avg_ns: if count > 0 { sum / count } else { 0 },
            min_ns: if count > 0 { self.min_ns.load(Ordering::Relaxed) } else { 0 },
            max_ns: self.max_ns.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub count: u64,
    pub avg_ns: u64,
    pub min_ns: u64,
    pub max_ns: u64,
}

// ============================================================================
// Engine metrics
// ============================================================================

#[derive(Debug, Default)]
pub struct EngineMetrics {
    pub orders_added: Counter,
    pub orders_modified: Counter,
    pub orders_cancelled: Counter,
    pub orders_rejected: Counter,
    pub priority_retained: Counter,
    pub priority_lost: Counter,
    pub resting_orders: Gauge,
    pub books: Gauge,
    pub latency: LatencyStats,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_added(&self) {
        self.orders_added.increment();
        self.resting_orders.add(1);
    }

    pub fn record_modified(&self, priority: QueuePriority) {
        self.orders_modified.increment();
        match priority {
            QueuePriority::Retained => self.priority_retained.increment(),
            QueuePriority::Lost => self.priority_lost.increment(),
        }
    }

    pub fn record_cancelled(&self) {
        self.orders_cancelled.increment();
        self.resting_orders.sub(1);
    }

    pub fn record_rejected(&self) {
        self.orders_rejected.increment();
    }

    pub fn record_latency(&self, elapsed: Duration) {
        self.latency.record(elapsed);
    }

    pub fn book_created(&self) {
        self.books.add(1);
    }

    /// A destroyed book takes its resting orders with it
    pub fn book_destroyed(&self, resting: usize) {
        self.books.sub(1);
        self.resting_orders.sub(resting as u64);
    }

    pub fn snapshot(&self) -> EngineMetricsSnapshot {
        EngineMetricsSnapshot {
            orders_added: self.orders_added.get(),
            orders_modified: self.orders_modified.get(),
            orders_cancelled: self.orders_cancelled.get(),
            orders_rejected: self.orders_rejected.get(),
            priority_retained: self.priority_retained.get(),
            priority_lost: self.priority_lost.get(),
            resting_orders: self.resting_orders.get(),
            books: self.books.get(),
            latency: self.latency.summary(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineMetricsSnapshot {
    pub orders_added: u64,
    pub orders_modified: u64,
    pub orders_cancelled: u64,
    pub orders_rejected: u64,
    pub priority_retained: u64,
    pub priority_lost: u64,
    pub resting_orders: u64,
    pub books: u64,
    pub latency: LatencySummary,
}
