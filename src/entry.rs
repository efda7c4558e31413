//! Cache entry record shared by the index and the replacement policy.
//!
//! An entry owns its key and value bytes plus the back-pointer slot the
//! policy uses to find its own node in O(1). The index never addresses the
//! raw key directly: it sees the *index key*, the concatenation of a 4-byte
//! little-endian length prefix and the key bytes. Two distinct raw keys can
//! therefore never produce index keys where one is a byte-prefix of the
//! other, which the radix index requires.

use std::sync::Arc;

use crate::policy::PolicySlot;

/// Width of the length prefix prepended to every indexed key.
pub(crate) const KEY_PREFIX_LEN: usize = 4;

/// Maximum raw key length: the prefixed length must fit in a `u32`.
pub const MAX_KEY_LEN: usize = u32::MAX as usize - KEY_PREFIX_LEN;

/// An entry held by the surrounding cache and referenced by both the index
/// (by key) and the replacement policy (by node handle).
pub struct CacheEntry {
    key: Box<[u8]>,
    value: Box<[u8]>,
    slot: Arc<PolicySlot>,
}

impl CacheEntry {
    /// Create an entry owning copies of `key` and `value`, with a
    /// zero-initialized policy slot.
    ///
    /// # Panics
    /// Panics if `key` is longer than [`MAX_KEY_LEN`].
    pub fn new(key: &[u8], value: &[u8]) -> Self {
        assert!(key.len() <= MAX_KEY_LEN, "key too long");
        Self {
            key: key.into(),
            value: value.into(),
            slot: Arc::new(PolicySlot::new()),
        }
    }

    /// The raw key bytes (without the length prefix).
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// The opaque value bytes.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// The back-pointer slot the replacement policy keeps coherent for this
    /// entry. Pass it to `attach`, `touch`, and targeted `evict`.
    pub fn policy_slot(&self) -> &Arc<PolicySlot> {
        &self.slot
    }

    pub(crate) fn index_key(&self) -> IndexKey<'_> {
        IndexKey::new(&self.key)
    }
}

/// Zero-copy view of a length-prefixed index key.
///
/// Byte positions `0..4` address the little-endian length prefix, positions
/// `4..` the raw key bytes.
#[derive(Clone, Copy)]
pub(crate) struct IndexKey<'a> {
    prefix: [u8; KEY_PREFIX_LEN],
    bytes: &'a [u8],
}

impl<'a> IndexKey<'a> {
    pub(crate) fn new(key: &'a [u8]) -> Self {
        Self {
            prefix: (key.len() as u32).to_le_bytes(),
            bytes: key,
        }
    }

    /// Total indexed length, prefix included.
    pub(crate) fn len(&self) -> u32 {
        (KEY_PREFIX_LEN + self.bytes.len()) as u32
    }

    /// Byte at position `i < self.len()`.
    pub(crate) fn at(&self, i: u32) -> u8 {
        let i = i as usize;
        if i < KEY_PREFIX_LEN {
            self.prefix[i]
        } else {
            self.bytes[i - KEY_PREFIX_LEN]
        }
    }

    /// Whole-key equality: lengths and every byte.
    pub(crate) fn same(&self, other: &IndexKey<'_>) -> bool {
        self.prefix == other.prefix && self.bytes == other.bytes
    }
}
