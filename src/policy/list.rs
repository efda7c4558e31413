//! Node store shared by the LRU policies: a slab of nodes threaded onto an
//! intrusive doubly-linked queue, head = least recently used.
//!
//! Nodes are addressed by `u32` slab index; `NIL` marks an absent link.
//! Every slot carries a generation that is bumped when the slot is released,
//! so a stale [`NodeHandle`] resolves to nothing rather than to whatever
//! node recycled the slot. The whole structure is only ever accessed under
//! the owning policy's mutex.

use std::sync::Arc;

use super::{NodeHandle, PolicySlot};
use crate::entry::CacheEntry;

pub(crate) const NIL: u32 = u32::MAX;

struct Node {
    /// Bumped on release; handles carry the generation they were minted with.
    generation: u32,
    prev: u32,
    /// Doubles as the free-list link while the slot is vacant.
    next: u32,
    data: Option<Arc<CacheEntry>>,
    entry_slot: Option<Arc<PolicySlot>>,
}

pub(crate) struct NodeList {
    nodes: Vec<Node>,
    free: u32,
    head: u32,
    tail: u32,
    len: usize,
}

impl NodeList {
    pub(crate) fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: NIL,
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Allocate a node for `data`, link it at the tail (most recently used),
    /// and return its handle.
    pub(crate) fn attach(&mut self, data: Arc<CacheEntry>, slot: Arc<PolicySlot>) -> NodeHandle {
        let index = if self.free != NIL {
            let index = self.free;
            self.free = self.nodes[index as usize].next;
            index
        } else {
            self.nodes.push(Node {
                generation: 1,
                prev: NIL,
                next: NIL,
                data: None,
                entry_slot: None,
            });
            (self.nodes.len() - 1) as u32
        };

        let node = &mut self.nodes[index as usize];
        node.prev = NIL;
        node.next = NIL;
        node.data = Some(data);
        node.entry_slot = Some(slot);
        let handle = NodeHandle::new(node.generation, index);

        self.push_tail(index);
        self.len += 1;
        handle
    }

    /// Resolve a handle to a live slab index, or `None` if the node was
    /// released since the handle was minted.
    pub(crate) fn resolve(&self, handle: NodeHandle) -> Option<u32> {
        let node = self.nodes.get(handle.index() as usize)?;
        (node.generation == handle.generation() && node.data.is_some()).then_some(handle.index())
    }

    /// Handle of the live node at `index`.
    pub(crate) fn handle_of(&self, index: u32) -> NodeHandle {
        NodeHandle::new(self.nodes[index as usize].generation, index)
    }

    /// Oldest node, if any.
    pub(crate) fn head(&self) -> Option<u32> {
        (self.head != NIL).then_some(self.head)
    }

    pub(crate) fn entry_slot(&self, index: u32) -> Option<&Arc<PolicySlot>> {
        self.nodes[index as usize].entry_slot.as_ref()
    }

    /// Re-link a node at the most-recently-used end.
    pub(crate) fn move_to_tail(&mut self, index: u32) {
        if self.tail == index {
            return;
        }
        self.unlink(index);
        self.push_tail(index);
    }

    /// Unlink a node and hand its slot back to the free list, bumping the
    /// generation so outstanding handles go stale. Returns the node's data
    /// and back-pointer slot.
    pub(crate) fn release(&mut self, index: u32) -> Option<(Arc<CacheEntry>, Arc<PolicySlot>)> {
        // Vacant slots thread their `next` through the free list; only
        // unlink nodes that are actually on the queue.
        if self.nodes[index as usize].data.is_none() {
            return None;
        }
        self.unlink(index);
        let node = &mut self.nodes[index as usize];
        let freed = node.data.take().zip(node.entry_slot.take())?;

        node.generation = node.generation.wrapping_add(1);
        if node.generation == 0 {
            node.generation = 1;
        }
        node.next = self.free;
        self.free = index;
        self.len -= 1;
        Some(freed)
    }

    fn push_tail(&mut self, index: u32) {
        let old_tail = self.tail;
        {
            let node = &mut self.nodes[index as usize];
            node.prev = old_tail;
            node.next = NIL;
        }
        if old_tail != NIL {
            self.nodes[old_tail as usize].next = index;
        } else {
            self.head = index;
        }
        self.tail = index;
    }

    fn unlink(&mut self, index: u32) {
        let (prev, next) = {
            let node = &mut self.nodes[index as usize];
            let links = (node.prev, node.next);
            node.prev = NIL;
            node.next = NIL;
            links
        };
        if prev != NIL {
            self.nodes[prev as usize].next = next;
        } else if self.head == index {
            self.head = next;
        }
        if next != NIL {
            self.nodes[next as usize].prev = prev;
        } else if self.tail == index {
            self.tail = prev;
        }
    }

    /// Head-to-tail slab indices. Test support.
    #[cfg(test)]
    pub(crate) fn order(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.len);
        let mut cursor = self.head;
        while cursor != NIL {
            out.push(cursor);
            cursor = self.nodes[cursor as usize].next;
        }
        out
    }
}
