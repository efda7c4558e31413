//! The "track nothing" policy.
//!
//! Exists so an enclosing cache can be parametrized over
//! [`PolicyKind`](super::PolicyKind) uniformly: entries are never tracked,
//! `evict` never nominates a victim,
//! and space pressure becomes the caller's problem.

use std::sync::Arc;

use super::{NodeHandle, PolicySlot, ReplacementPolicy};
use crate::entry::CacheEntry;

pub struct NonePolicy;

impl ReplacementPolicy for NonePolicy {
    fn attach(&self, _data: Arc<CacheEntry>, _slot: &Arc<PolicySlot>) -> Option<NodeHandle> {
        None
    }

    fn touch(&self, _slot: &PolicySlot) {}

    fn evict(&self, _slot: Option<&PolicySlot>) -> Option<Arc<CacheEntry>> {
        None
    }
}
