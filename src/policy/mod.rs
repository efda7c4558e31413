//! Replacement policies: who gets evicted when space pressure arises.
//!
//! Every live cache entry is tracked by exactly one policy node. The policy
//! writes an opaque handle to that node into the entry's [`PolicySlot`];
//! `touch` and targeted `evict` read the slot back, which makes both O(1)
//! and makes touching an already-evicted entry a harmless no-op (the slot is
//! nulled on eviction).

mod buffered;
mod list;
mod lru;
mod none;

pub use buffered::{BufferedLruPolicy, DEFAULT_TOUCH_CAPACITY};
pub use lru::LruPolicy;
pub use none::NonePolicy;

use std::sync::Arc;

use crate::entry::CacheEntry;
use crate::metrics::CacheMetrics;
use crate::sync::{AtomicU8, AtomicU32, AtomicU64, Ordering};

/// Touch tri-state: the node sits at its natural list position.
pub(crate) const TOUCH_IDLE: u8 = 0;
/// A toucher won the flag and is claiming a buffer cell.
pub(crate) const TOUCH_RESERVING: u8 = 1;
/// The node's handle is live in the touched buffer.
pub(crate) const TOUCH_PENDING: u8 = 2;

/// Opaque identifier of a policy node.
///
/// Packs a slab index with a generation; a recycled slab slot gets a new
/// generation, so a handle held across an eviction resolves to nothing
/// instead of to an unrelated node. The raw value of a live handle is never
/// zero, which reserves zero as the slot's "no node" state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(u64);

impl NodeHandle {
    pub(crate) fn new(generation: u32, index: u32) -> Self {
        debug_assert!(generation != 0);
        Self(((generation as u64) << 32) | index as u64)
    }

    pub(crate) fn from_raw(raw: u64) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }

    pub(crate) fn raw(self) -> u64 {
        self.0
    }

    pub(crate) fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub(crate) fn index(self) -> u32 {
        self.0 as u32
    }
}

/// Back-pointer slot embedded in a cache entry.
///
/// The policy keeps it coherent across the node's lifetime: `attach` writes
/// the node handle, eviction nulls it. The touch flag and buffer index live
/// here as well so the touch fast path never needs the policy mutex.
pub struct PolicySlot {
    /// Raw [`NodeHandle`] of the owning node, or 0 when detached.
    node: AtomicU64,
    /// Tri-state touch flag, one of the `TOUCH_*` constants.
    state: AtomicU8,
    /// Touched-buffer cell claimed while the flag is pending.
    touch_index: AtomicU32,
}

impl PolicySlot {
    /// A detached slot; equivalent to zero-initialization.
    pub fn new() -> Self {
        Self {
            node: AtomicU64::new(0),
            state: AtomicU8::new(TOUCH_IDLE),
            touch_index: AtomicU32::new(0),
        }
    }

    /// True when no policy node currently owns this slot.
    pub fn is_detached(&self) -> bool {
        self.node.load(Ordering::Acquire) == 0
    }

    pub(crate) fn node(&self) -> Option<NodeHandle> {
        NodeHandle::from_raw(self.node.load(Ordering::Acquire))
    }

    pub(crate) fn clear_node(&self) {
        self.node.store(0, Ordering::Release);
    }

    /// Rebind the slot to a fresh node. Only called under the policy mutex,
    /// with no touches in flight (the entry is not yet published).
    pub(crate) fn bind(&self, handle: NodeHandle) {
        self.touch_index.store(0, Ordering::Relaxed);
        self.state.store(TOUCH_IDLE, Ordering::Release);
        self.node.store(handle.raw(), Ordering::Release);
    }

    pub(crate) fn touch_state(&self) -> &AtomicU8 {
        &self.state
    }

    pub(crate) fn touch_index(&self) -> &AtomicU32 {
        &self.touch_index
    }
}

impl Default for PolicySlot {
    fn default() -> Self {
        Self::new()
    }
}

/// A replacement policy tracking cache entries and nominating eviction
/// victims.
///
/// All implementations are thread-safe. `attach`, targeted `evict`, and
/// oldest-first `evict` serialize on an internal mutex; `touch` is expected
/// to stay off that mutex on its fast path where the policy supports it.
pub trait ReplacementPolicy: Send + Sync {
    /// Start tracking `data`, writing the new node's handle into `slot`.
    ///
    /// The node starts at the most-recently-used end. Returns the handle,
    /// or `None` for policies that do not track anything.
    fn attach(&self, data: Arc<CacheEntry>, slot: &Arc<PolicySlot>) -> Option<NodeHandle>;

    /// Record a use of the entry owning `slot`.
    ///
    /// A no-op when the slot is detached (the node was already evicted).
    fn touch(&self, slot: &PolicySlot);

    /// Stop tracking one entry and return its data.
    ///
    /// With `Some(slot)` the node owning that slot is removed (targeted
    /// detach). With `None` the policy nominates its own victim, the least
    /// recently used entry it knows of. Returns `None` when there is
    /// nothing to evict. The slot is nulled, so later touches through it
    /// are no-ops.
    fn evict(&self, slot: Option<&PolicySlot>) -> Option<Arc<CacheEntry>>;
}

/// Selects a [`ReplacementPolicy`] implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolicyKind {
    /// Track nothing; `evict` never nominates a victim.
    None,
    /// Exact LRU; every touch takes the policy mutex.
    Lru,
    /// Approximate LRU batching touches through a lock-free buffer.
    #[default]
    BufferedLru,
}

impl PolicyKind {
    /// Build the selected policy with its own private metrics.
    pub fn create(self) -> Box<dyn ReplacementPolicy> {
        self.create_with_metrics(Arc::new(CacheMetrics::new()))
    }

    /// Build the selected policy reporting into a shared metrics set.
    pub fn create_with_metrics(self, metrics: Arc<CacheMetrics>) -> Box<dyn ReplacementPolicy> {
        match self {
            PolicyKind::None => Box::new(NonePolicy),
            PolicyKind::Lru => Box::new(LruPolicy::with_metrics(metrics)),
            PolicyKind::BufferedLru => Box::new(BufferedLruPolicy::with_metrics(metrics)),
        }
    }
}
