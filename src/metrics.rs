use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Monotonically increasing counter
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn value(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

/// Gauge that can increase or decrease
pub struct Gauge(AtomicI64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicI64::new(0))
    }

    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement(&self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn value(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for Gauge {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-instance metrics for observability and testing
///
/// Each index/policy instance holds (or shares) its own set of metrics,
/// allowing:
/// - Isolated testing with loom (no global state contamination)
/// - Multiple cache instances with independent metrics
/// - Clean metric validation in tests
pub struct CacheMetrics {
    // Index operations
    pub index_insert: Counter,
    pub index_insert_exists: Counter,
    pub index_split: Counter, // Inserts that allocated a new internal node
    pub index_hit: Counter,
    pub index_miss: Counter,
    pub index_remove: Counter,
    pub index_remove_not_found: Counter,
    pub index_edge_shorten: Counter, // Single-child parents collapsed after remove

    // Replacement policy operations
    pub policy_attach: Counter,
    pub policy_touch: Counter,          // Touches that claimed a buffer cell
    pub policy_touch_overflow: Counter, // Touches that had to drain a full buffer
    pub policy_drain: Counter,
    pub policy_drain_moved: Counter, // Nodes moved to the tail by drains
    pub policy_evict: Counter,
    pub policy_evict_empty: Counter,

    // Current state gauges
    pub entries_indexed: Gauge,
    pub nodes_tracked: Gauge,
}

impl CacheMetrics {
    /// Create a new set of metrics
    pub fn new() -> Self {
        Self {
            index_insert: Counter::new(),
            index_insert_exists: Counter::new(),
            index_split: Counter::new(),
            index_hit: Counter::new(),
            index_miss: Counter::new(),
            index_remove: Counter::new(),
            index_remove_not_found: Counter::new(),
            index_edge_shorten: Counter::new(),
            policy_attach: Counter::new(),
            policy_touch: Counter::new(),
            policy_touch_overflow: Counter::new(),
            policy_drain: Counter::new(),
            policy_drain_moved: Counter::new(),
            policy_evict: Counter::new(),
            policy_evict_empty: Counter::new(),
            entries_indexed: Gauge::new(),
            nodes_tracked: Gauge::new(),
        }
    }
}

impl Default for CacheMetrics {
    fn default() -> Self {
        Self::new()
    }
}
