//! Approximate LRU with a lock-free touch fast path.
//!
//! # Design
//!
//! A doubly-linked queue (head = oldest) plus a bounded "touched" buffer of
//! node handles. A cache hit does not take the policy mutex: it claims the
//! entry's touch flag with one CAS, reserves a buffer cell with one
//! fetch-add, and stores the node handle there. The buffer is folded back
//! into the queue (each touched node moved to the tail) only when it
//! overflows or when a victim is about to be nominated.
//!
//! # Touch flag
//!
//! Each slot carries a tri-state flag:
//!
//! ```text
//! Idle ──CAS──► Reserving ──CAS──► Pending ──drain/evict──► Idle
//! ```
//!
//! The flag admits exactly one buffer reservation per node per drain cycle;
//! concurrent touches of a hot entry collapse into one cell. Only the
//! winning toucher may move the flag from Reserving to Pending, and drains
//! and evictions only move it from Pending to Idle, so a failed
//! Reserving→Pending transition means two parties used one slot outside the
//! contract and the process fail-stops.
//!
//! # Ordering
//!
//! `evict(None)` drains first, so every node touched since the previous
//! drain outranks every untouched node. Touches within one drain cycle are
//! unordered among themselves; that is the "approximate" in approximate
//! LRU. Stale buffer entries (nodes evicted after being touched) are
//! filtered out by handle generation during the drain.

use std::sync::Arc;

use crossbeam_utils::CachePadded;
use log::{error, trace};

use super::list::NodeList;
use super::{
    NodeHandle, PolicySlot, ReplacementPolicy, TOUCH_IDLE, TOUCH_PENDING, TOUCH_RESERVING,
};
use crate::entry::CacheEntry;
use crate::metrics::CacheMetrics;
use crate::sync::{AtomicU32, AtomicU64, Mutex, MutexGuard, Ordering, lock};

/// Default touched-buffer capacity, in nodes.
pub const DEFAULT_TOUCH_CAPACITY: usize = 256;

pub struct BufferedLruPolicy {
    list: Mutex<NodeList>,
    /// Raw node handles awaiting reordering; 0 marks a vacant cell.
    touched: Box<[AtomicU64]>,
    /// Next buffer cell to hand out. Reset to zero by every drain.
    reserved: CachePadded<AtomicU32>,
    metrics: Arc<CacheMetrics>,
}

impl BufferedLruPolicy {
    /// Policy with the default touched-buffer capacity.
    pub fn new() -> Self {
        Self::with_touch_capacity(DEFAULT_TOUCH_CAPACITY, Arc::new(CacheMetrics::new()))
    }

    pub fn with_metrics(metrics: Arc<CacheMetrics>) -> Self {
        Self::with_touch_capacity(DEFAULT_TOUCH_CAPACITY, metrics)
    }

    /// Policy with an explicit touched-buffer capacity.
    ///
    /// Smaller buffers drain (and take the mutex) more often; larger ones
    /// defer more reordering to eviction time.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn with_touch_capacity(capacity: usize, metrics: Arc<CacheMetrics>) -> Self {
        assert!(capacity > 0, "touch buffer capacity must be nonzero");
        Self {
            list: Mutex::new(NodeList::new()),
            touched: (0..capacity).map(|_| AtomicU64::new(0)).collect(),
            reserved: CachePadded::new(AtomicU32::new(0)),
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

    /// Claim a touched-buffer cell, draining the buffer under the mutex
    /// whenever the reservation lands past the end.
    fn reserve_cell(&self) -> usize {
        loop {
            let cell = self.reserved.fetch_add(1, Ordering::AcqRel) as usize;
            if cell < self.touched.len() {
                return cell;
            }
            self.metrics.policy_touch_overflow.increment();
            let mut list = lock(&self.list);
            self.drain(&mut list);
        }
    }

    /// Fold the touched buffer back into the queue. Mutex held.
    fn drain(&self, list: &mut MutexGuard<'_, NodeList>) {
        let pending = (self.reserved.load(Ordering::Acquire) as usize).min(self.touched.len());
        let mut moved = 0u64;
        for cell in &self.touched[..pending] {
            let Some(handle) = NodeHandle::from_raw(cell.swap(0, Ordering::AcqRel)) else {
                continue;
            };
            // A stale generation means the node was evicted after it was
            // touched; its reservation just evaporates.
            let Some(index) = list.resolve(handle) else {
                continue;
            };
            list.move_to_tail(index);
            moved += 1;
            if let Some(slot) = list.entry_slot(index) {
                // Re-arm the flag so the node can be touched again. An
                // in-flight toucher still in Reserving keeps the flag; it
                // completes to Pending and is handled by a later drain.
                let _ = slot.touch_state().compare_exchange(
                    TOUCH_PENDING,
                    TOUCH_IDLE,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
                self.metrics.policy_drain_moved.increment();
            }
        }
        self.reserved.store(0, Ordering::Release);
        self.metrics.policy_drain.increment();
        trace!("drained {moved} touched nodes into the queue");
    }

    /// Unlink a node, sever its slot, and scrub any live buffer cell.
    /// Mutex held.
    fn remove_node(&self, list: &mut MutexGuard<'_, NodeList>, index: u32) -> Arc<CacheEntry> {
        let handle = list.handle_of(index);
        let Some((data, slot)) = list.release(index) else {
            unreachable!("releasing a vacant policy node");
        };

        // Later touches through this slot must see no node.
        slot.clear_node();

        // If the node sits in the touched buffer, clear that cell so the
        // next drain does not chase a dead handle. The compare-exchange
        // guards against wiping a cell that was already recycled for some
        // other node's reservation.
        if slot
            .touch_state()
            .compare_exchange(
                TOUCH_PENDING,
                TOUCH_IDLE,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        {
            let cell = slot.touch_index().load(Ordering::Acquire) as usize;
            if let Some(cell) = self.touched.get(cell) {
                let _ = cell.compare_exchange(
                    handle.raw(),
                    0,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
            }
        }

        self.metrics.policy_evict.increment();
        self.metrics.nodes_tracked.decrement();
        data
    }
}

impl ReplacementPolicy for BufferedLruPolicy {
    fn attach(&self, data: Arc<CacheEntry>, slot: &Arc<PolicySlot>) -> Option<NodeHandle> {
        let mut list = lock(&self.list);
        let handle = list.attach(data, Arc::clone(slot));
        slot.bind(handle);
        self.metrics.policy_attach.increment();
        self.metrics.nodes_tracked.increment();
        Some(handle)
    }

    fn touch(&self, slot: &PolicySlot) {
        // Read the handle through the slot every time; a cached handle
        // would race eviction. A detached slot makes the touch a no-op.
        let Some(handle) = slot.node() else {
            return;
        };

        // One reservation per node per drain cycle.
        if slot
            .touch_state()
            .compare_exchange(
                TOUCH_IDLE,
                TOUCH_RESERVING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return;
        }

        let cell = self.reserve_cell();
        self.touched[cell].store(handle.raw(), Ordering::Release);
        slot.touch_index().store(cell as u32, Ordering::Release);

        if slot
            .touch_state()
            .compare_exchange(
                TOUCH_RESERVING,
                TOUCH_PENDING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            // Nothing else transitions a flag out of Reserving; the slot
            // was re-bound or touched from a context the contract forbids.
            error!("touch flag left Reserving underneath the reserving thread");
            panic!("policy slot used concurrently outside its contract");
        }
        self.metrics.policy_touch.increment();
    }

    fn evict(&self, slot: Option<&PolicySlot>) -> Option<Arc<CacheEntry>> {
        let mut list = lock(&self.list);
        let index = match slot {
            Some(slot) => slot.node().and_then(|handle| list.resolve(handle)),
            None => {
                // Touched-but-not-drained nodes are recently used; fold them
                // in before picking the oldest.
                self.drain(&mut list);
                list.head()
            }
        };
        let Some(index) = index else {
            self.metrics.policy_evict_empty.increment();
            return None;
        };
        Some(self.remove_node(&mut list, index))
    }
}

impl Default for BufferedLruPolicy {
    fn default() -> Self {
        Self::new()
    }
}
