//! End-to-end trie behavior, including roots that must match the reference
//! implementations bit for bit.

use patricia_db::{BatchOp, MemoryDb, Trie, EMPTY_ROOT_HASH};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

fn fresh() -> Trie {
    Trie::new(Arc::new(MemoryDb::new()))
}

#[test]
fn empty_trie_has_the_well_known_root() {
    assert_eq!(fresh().root(), EMPTY_ROOT_HASH);
}

#[test]
fn reference_root_insert() {
    // go-ethereum trie TestInsert.
    let trie = fresh();
    trie.put(b"doe", b"reindeer").unwrap();
    trie.put(b"dog", b"puppy").unwrap();
    trie.put(b"dogglesworth", b"cat").unwrap();
    assert_eq!(
        trie.root(),
        alloy_primitives::b256!("8aad789dff2f538bca5d8ea56e8abe10f4c7ba3a5dea95fea4cd6e7c3a1168d3"),
    );
}

#[test]
fn reference_root_delete() {
    // go-ethereum trie TestDelete: empty values double as deletes.
    let trie = fresh();
    let ops: [(&[u8], &[u8]); 8] = [
        (b"do", b"verb"),
        (b"ether", b"wookiedoo"),
        (b"horse", b"stallion"),
        (b"shaman", b"horse"),
        (b"doge", b"coin"),
        (b"ether", b""),
        (b"dog", b"puppy"),
        (b"shaman", b""),
    ];
    for (key, value) in ops {
        trie.put(key, value).unwrap();
    }
    assert_eq!(
        trie.root(),
        alloy_primitives::b256!("5991bb8c6514148a29db676a14ac506cd2cd5775ace63c30a4fe457715e9ac84"),
    );
}

#[test]
fn round_trips() {
    let trie = fresh();
    trie.put(b"key", b"value").unwrap();
    assert_eq!(trie.get(b"key").unwrap(), Some(b"value".to_vec()));

    trie.del(b"key").unwrap();
    assert_eq!(trie.get(b"key").unwrap(), None);
    assert_eq!(trie.root(), EMPTY_ROOT_HASH);

    trie.del(b"key").unwrap();
    assert_eq!(trie.get(b"key").unwrap(), None);
}

#[test]
fn reopening_at_a_root_sees_the_old_state() {
    let db = Arc::new(MemoryDb::new());
    let trie = Trie::new(Arc::clone(&db) as Arc<dyn patricia_db::Database>);
    trie.put(b"doe", b"reindeer").unwrap();
    let before = trie.root();
    trie.put(b"dog", b"puppy").unwrap();

    // Old nodes are never mutated, so the earlier root still resolves.
    let old = Trie::with_root(Arc::clone(&db) as Arc<dyn patricia_db::Database>, before);
    assert_eq!(old.get(b"doe").unwrap(), Some(b"reindeer".to_vec()));
    assert_eq!(old.get(b"dog").unwrap(), None);
    assert_eq!(trie.get(b"dog").unwrap(), Some(b"puppy".to_vec()));
}

#[test]
fn batch_matches_individual_ops() {
    let batched = fresh();
    batched
        .batch(&[
            BatchOp::Put { key: b"father".to_vec(), value: b"jim".to_vec() },
            BatchOp::Put { key: b"mother".to_vec(), value: b"sara".to_vec() },
            BatchOp::Put { key: b"son".to_vec(), value: b"will".to_vec() },
            BatchOp::Del { key: b"mother".to_vec() },
        ])
        .unwrap();

    let manual = fresh();
    manual.put(b"father", b"jim").unwrap();
    manual.put(b"son", b"will").unwrap();
    assert_eq!(batched.root(), manual.root());
}

#[test]
fn deep_shared_prefixes() {
    let trie = fresh();
    let keys: Vec<Vec<u8>> = (0..64u8).map(|i| vec![0xab, 0xcd, i]).collect();
    for (i, key) in keys.iter().enumerate() {
        trie.put(key, format!("value-{i}").as_bytes()).unwrap();
    }
    for (i, key) in keys.iter().enumerate() {
        assert_eq!(trie.get(key).unwrap(), Some(format!("value-{i}").into_bytes()));
    }

    // Remove half and compare against a trie that only ever saw the rest.
    for key in &keys[..32] {
        trie.del(key).unwrap();
    }
    let other = fresh();
    for (i, key) in keys.iter().enumerate().skip(32) {
        other.put(key, format!("value-{i}").as_bytes()).unwrap();
    }
    assert_eq!(trie.root(), other.root());
}

#[test]
fn long_keys_and_values() {
    let trie = fresh();
    let key = [0x77u8; 100];
    let value = vec![0x99u8; 500];
    trie.put(&key, &value).unwrap();
    assert_eq!(trie.get(&key).unwrap(), Some(value));
    trie.del(&key).unwrap();
    assert_eq!(trie.root(), EMPTY_ROOT_HASH);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn matches_model_map(
        ops in prop::collection::vec(
            (prop::collection::vec(any::<u8>(), 0..6), prop::collection::vec(any::<u8>(), 0..40)),
            1..60,
        )
    ) {
        let trie = fresh();
        let mut model: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
        for (key, value) in &ops {
            trie.put(key, value).unwrap();
            if value.is_empty() {
                model.remove(key);
            } else {
                model.insert(key.clone(), value.clone());
            }
        }

        for (key, value) in &model {
            let got = trie.get(key).unwrap();
            prop_assert_eq!(got.as_ref(), Some(value));
        }
        for (key, _) in &ops {
            prop_assert_eq!(trie.get(key).unwrap(), model.get(key).cloned());
        }

        // Replaying just the surviving contents in key order reproduces the
        // root exactly.
        let replay = fresh();
        for (key, value) in &model {
            replay.put(key, value).unwrap();
        }
        prop_assert_eq!(replay.root(), trie.root());

        // The stream agrees with the model.
        let streamed: BTreeMap<Vec<u8>, Vec<u8>> = trie.read_stream().unwrap().collect();
        prop_assert_eq!(&streamed, &model);

        // Deleting everything always lands back on the empty root.
        for key in model.keys() {
            trie.del(key).unwrap();
        }
        prop_assert_eq!(trie.root(), EMPTY_ROOT_HASH);
    }

    #[test]
    fn insertion_order_is_irrelevant(
        mut entries in prop::collection::btree_map(
            prop::collection::vec(any::<u8>(), 0..5),
            prop::collection::vec(any::<u8>(), 1..20),
            1..20,
        ),
        seed in any::<u64>(),
    ) {
        let ordered = fresh();
        for (key, value) in &entries {
            ordered.put(key, value).unwrap();
        }

        // A cheap deterministic shuffle.
        let mut shuffled: Vec<_> = std::mem::take(&mut entries).into_iter().collect();
        let len = shuffled.len();
        let mut state = seed | 1;
        for i in (1..len).rev() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let j = (state >> 33) as usize % (i + 1);
            shuffled.swap(i, j);
        }

        let unordered = fresh();
        for (key, value) in &shuffled {
            unordered.put(key, value).unwrap();
        }
        prop_assert_eq!(ordered.root(), unordered.root());
    }
}
