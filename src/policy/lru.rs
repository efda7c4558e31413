//! Strict LRU: exact recency order, every operation under the list mutex.
//!
//! Simpler and exactly ordered, but every cache hit contends on the policy
//! lock. Workloads with hot read paths want
//! [`BufferedLruPolicy`](super::BufferedLruPolicy) instead.

use std::sync::Arc;

use super::list::NodeList;
use super::{NodeHandle, PolicySlot, ReplacementPolicy};
use crate::entry::CacheEntry;
use crate::metrics::CacheMetrics;
use crate::sync::{Mutex, lock};

pub struct LruPolicy {
    list: Mutex<NodeList>,
    metrics: Arc<CacheMetrics>,
}

impl LruPolicy {
    pub fn new() -> Self {
        Self::with_metrics(Arc::new(CacheMetrics::new()))
    }

    pub fn with_metrics(metrics: Arc<CacheMetrics>) -> Self {
        Self {
            list: Mutex::new(NodeList::new()),
            metrics,
        }
    }

    /// The metrics this policy reports into.
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Number of entries currently tracked.
    pub fn len(&self) -> usize {
        lock(&self.list).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReplacementPolicy for LruPolicy {
    fn attach(&self, data: Arc<CacheEntry>, slot: &Arc<PolicySlot>) -> Option<NodeHandle> {
        let mut list = lock(&self.list);
        let handle = list.attach(data, Arc::clone(slot));
        slot.bind(handle);
        self.metrics.policy_attach.increment();
        self.metrics.nodes_tracked.increment();
        Some(handle)
    }

    fn touch(&self, slot: &PolicySlot) {
        let mut list = lock(&self.list);
        if let Some(index) = slot.node().and_then(|handle| list.resolve(handle)) {
            list.move_to_tail(index);
            self.metrics.policy_touch.increment();
        }
    }

    fn evict(&self, slot: Option<&PolicySlot>) -> Option<Arc<CacheEntry>> {
        let mut list = lock(&self.list);
        let index = match slot {
            Some(slot) => slot.node().and_then(|handle| list.resolve(handle)),
            None => list.head(),
        };
        let Some(index) = index else {
            self.metrics.policy_evict_empty.increment();
            return None;
        };

        let (data, entry_slot) = list.release(index)?;
        entry_slot.clear_node();
        self.metrics.policy_evict.increment();
        self.metrics.nodes_tracked.decrement();
        Some(data)
    }
}

impl Default for LruPolicy {
    fn default() -> Self {
        Self::new()
    }
}
