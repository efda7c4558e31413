use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;
use proptest_derive::Arbitrary;

use crate::metrics::CacheMetrics;
use crate::policy::{BufferedLruPolicy, LruPolicy, ReplacementPolicy};
use crate::{CacheEntry, Index, IndexError};

/// Wrapper for key generation with custom strategy
#[derive(Debug, Clone)]
struct Key(Vec<u8>);

impl Arbitrary for Key {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            // Empty key
            Just(Key(vec![])),
            // Tiny alphabet to force shared prefixes and nibble-level splits
            prop::collection::vec(0u8..4, 1..4).prop_map(Key),
            // High/low nibble divergence within one byte
            prop::collection::vec(
                prop_oneof![Just(0x0Fu8), Just(0xF0), Just(0xFF), Just(0x00)],
                1..4
            )
            .prop_map(Key),
            // Arbitrary short binary keys
            prop::collection::vec(any::<u8>(), 0..12).prop_map(Key),
            // Same bytes at different lengths (prefix-shaped raw keys)
            (0usize..6).prop_map(|n| Key(b"abcde"[..n].to_vec())),
        ]
        .boxed()
    }
}

/// Actions to run against the index and a BTreeMap model
#[derive(Arbitrary, Debug, Clone)]
enum IndexAction {
    Insert(Key, u64),
    Get(Key),
    Remove(Key),
}

struct IndexTest {
    index: Index,
    model: BTreeMap<Vec<u8>, u64>,
}

impl IndexTest {
    fn new() -> Self {
        Self {
            index: Index::new(),
            model: BTreeMap::new(),
        }
    }

    fn execute(&mut self, action: IndexAction) {
        match action {
            IndexAction::Insert(key, value) => {
                let entry = Arc::new(CacheEntry::new(&key.0, &value.to_le_bytes()));
                let result = self.index.insert(&entry);
                if self.model.contains_key(&key.0) {
                    assert_eq!(result, Err(IndexError::KeyExists), "key={:?}", key.0);
                } else {
                    assert_eq!(result, Ok(()), "key={:?}", key.0);
                    self.model.insert(key.0, value);
                }
            }
            IndexAction::Get(key) => {
                let got = self.index.get(&key.0).map(|e| e.value().to_vec());
                let expected = self.model.get(&key.0).map(|v| v.to_le_bytes().to_vec());
                assert_eq!(got, expected, "key={:?}", key.0);
            }
            IndexAction::Remove(key) => {
                let got = self.index.remove(&key.0).map(|e| e.value().to_vec());
                let expected = self.model.remove(&key.0).map(|v| v.to_le_bytes().to_vec());
                assert_eq!(got, expected, "key={:?}", key.0);
            }
        }
        assert_eq!(self.index.len(), self.model.len());
        self.index.check_invariants();
    }
}

/// Actions to run against a policy and its model. Indices select among the
/// entries attached so far (modulo), so they also hit already-evicted slots.
#[derive(Arbitrary, Debug, Clone)]
enum PolicyAction {
    Attach,
    Touch(usize),
    EvictOldest,
    EvictTargeted(usize),
}

/// Deterministic single-threaded model of the buffered-LRU protocol:
/// a recency list, a bounded reservation buffer, and one pending
/// reservation per node per drain cycle.
struct BufferedModel {
    list: Vec<u64>,
    buffer: Vec<Option<u64>>,
    capacity: usize,
}

impl BufferedModel {
    fn new(capacity: usize) -> Self {
        Self {
            list: Vec::new(),
            buffer: Vec::new(),
            capacity,
        }
    }

    fn attach(&mut self, id: u64) {
        self.list.push(id);
    }

    fn touch(&mut self, id: u64) {
        if !self.list.contains(&id) || self.buffer.contains(&Some(id)) {
            return;
        }
        if self.buffer.len() == self.capacity {
            self.drain();
        }
        self.buffer.push(Some(id));
    }

    fn drain(&mut self) {
        for cell in std::mem::take(&mut self.buffer) {
            let Some(id) = cell else { continue };
            if let Some(pos) = self.list.iter().position(|&x| x == id) {
                self.list.remove(pos);
                self.list.push(id);
            }
        }
    }

    fn evict_oldest(&mut self) -> Option<u64> {
        self.drain();
        if self.list.is_empty() {
            None
        } else {
            Some(self.list.remove(0))
        }
    }

    fn evict_targeted(&mut self, id: u64) -> Option<u64> {
        let pos = self.list.iter().position(|&x| x == id)?;
        self.list.remove(pos);
        for cell in self.buffer.iter_mut() {
            if *cell == Some(id) {
                *cell = None;
            }
        }
        Some(id)
    }
}

fn policy_entry(id: u64) -> Arc<CacheEntry> {
    Arc::new(CacheEntry::new(&id.to_le_bytes(), &id.to_le_bytes()))
}

fn entry_id(entry: &CacheEntry) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(entry.key());
    u64::from_le_bytes(bytes)
}

fn run_buffered(capacity: usize, actions: Vec<PolicyAction>) {
    let policy = BufferedLruPolicy::with_touch_capacity(capacity, Arc::new(CacheMetrics::new()));
    let mut model = BufferedModel::new(capacity);
    let mut entries: Vec<Arc<CacheEntry>> = Vec::new();

    for action in actions {
        match action {
            PolicyAction::Attach => {
                let id = entries.len() as u64;
                let entry = policy_entry(id);
                policy
                    .attach(Arc::clone(&entry), entry.policy_slot())
                    .unwrap();
                model.attach(id);
                entries.push(entry);
            }
            PolicyAction::Touch(pick) => {
                if entries.is_empty() {
                    continue;
                }
                let entry = &entries[pick % entries.len()];
                policy.touch(entry.policy_slot());
                model.touch(entry_id(entry));
            }
            PolicyAction::EvictOldest => {
                let got = policy.evict(None).map(|e| entry_id(&e));
                assert_eq!(got, model.evict_oldest());
            }
            PolicyAction::EvictTargeted(pick) => {
                if entries.is_empty() {
                    continue;
                }
                let entry = &entries[pick % entries.len()];
                let got = policy.evict(Some(entry.policy_slot())).map(|e| entry_id(&e));
                assert_eq!(got, model.evict_targeted(entry_id(entry)));
            }
        }
        assert_eq!(policy.len(), model.list.len());
    }

    // Drain both to the end; full eviction order must agree.
    loop {
        let got = policy.evict(None).map(|e| entry_id(&e));
        let expected = model.evict_oldest();
        assert_eq!(got, expected);
        if got.is_none() {
            break;
        }
    }
}

fn run_strict(actions: Vec<PolicyAction>) {
    let policy = LruPolicy::new();
    let mut model: Vec<u64> = Vec::new();
    let mut entries: Vec<Arc<CacheEntry>> = Vec::new();

    for action in actions {
        match action {
            PolicyAction::Attach => {
                let id = entries.len() as u64;
                let entry = policy_entry(id);
                policy
                    .attach(Arc::clone(&entry), entry.policy_slot())
                    .unwrap();
                model.push(id);
                entries.push(entry);
            }
            PolicyAction::Touch(pick) => {
                if entries.is_empty() {
                    continue;
                }
                let entry = &entries[pick % entries.len()];
                policy.touch(entry.policy_slot());
                let id = entry_id(entry);
                if let Some(pos) = model.iter().position(|&x| x == id) {
                    model.remove(pos);
                    model.push(id);
                }
            }
            PolicyAction::EvictOldest => {
                let got = policy.evict(None).map(|e| entry_id(&e));
                let expected = if model.is_empty() {
                    None
                } else {
                    Some(model.remove(0))
                };
                assert_eq!(got, expected);
            }
            PolicyAction::EvictTargeted(pick) => {
                if entries.is_empty() {
                    continue;
                }
                let entry = &entries[pick % entries.len()];
                let id = entry_id(entry);
                let got = policy.evict(Some(entry.policy_slot())).map(|e| entry_id(&e));
                let expected = model.iter().position(|&x| x == id).map(|pos| {
                    model.remove(pos);
                    id
                });
                assert_eq!(got, expected);
            }
        }
        assert_eq!(policy.len(), model.len());
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn proptest_index_vs_btreemap(actions in prop::collection::vec(any::<IndexAction>(), 1..128)) {
        let mut test = IndexTest::new();
        for action in actions {
            test.execute(action);
        }
    }

    #[test]
    fn proptest_buffered_lru_vs_model(
        capacity in 1usize..8,
        actions in prop::collection::vec(any::<PolicyAction>(), 1..128),
    ) {
        run_buffered(capacity, actions);
    }

    #[test]
    fn proptest_strict_lru_vs_model(actions in prop::collection::vec(any::<PolicyAction>(), 1..128)) {
        run_strict(actions);
    }
}
