//! Volatile cache core: a nibble-sliced radix index over binary keys and
//! the replacement policies that decide which entry goes when space runs
//! out.
//!
//! The two halves reference the same [`CacheEntry`] records and are wired
//! together by the enclosing cache: insert into the index and attach to the
//! policy on a put, touch on a hit, evict from the policy and remove from
//! the index under pressure.
//!
//! # Example
//!
//! ```rust
//! use nibcache::{CacheEntry, Index, PolicyKind, ReplacementPolicy};
//! use std::sync::Arc;
//!
//! let index = Index::new();
//! let policy = PolicyKind::BufferedLru.create();
//!
//! // put
//! let entry = Arc::new(CacheEntry::new(b"answer", b"42"));
//! index.insert(&entry).unwrap();
//! let _ = policy.attach(Arc::clone(&entry), entry.policy_slot());
//!
//! // hit
//! if let Some(found) = index.get(b"answer") {
//!     policy.touch(found.policy_slot());
//! }
//!
//! // pressure: drop the least recently used entry
//! if let Some(victim) = policy.evict(None) {
//!     index.remove(victim.key());
//! }
//! assert!(index.is_empty());
//! ```

mod entry;
mod index;
mod metrics;
pub mod policy;
mod sync;
mod util;

#[cfg(all(test, not(feature = "loom")))]
mod proptests;

pub use entry::{CacheEntry, MAX_KEY_LEN};
pub use index::Index;
pub use metrics::{CacheMetrics, Counter, Gauge};
pub use policy::{
    BufferedLruPolicy, LruPolicy, NodeHandle, NonePolicy, PolicyKind, PolicySlot,
    ReplacementPolicy,
};

/// Error types for index insertion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexError {
    /// An entry with a byte-identical key is already indexed. The index
    /// does not replace; the caller decides what to do with the loser.
    KeyExists,
}
