#![allow(missing_docs)]

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use patricia_db::{MemoryDb, Trie};
use std::hint::black_box;
use std::sync::Arc;

fn keyed_entries(count: u64) -> Vec<([u8; 32], Vec<u8>)> {
    (0..count)
        .map(|i| {
            let key = alloy_primitives::keccak256(i.to_be_bytes());
            let value = alloy_primitives::keccak256(key).to_vec();
            (key.0, value)
        })
        .collect()
}

fn populated(entries: &[([u8; 32], Vec<u8>)]) -> Trie {
    let trie = Trie::new(Arc::new(MemoryDb::new()));
    for (key, value) in entries {
        trie.put(key, value).unwrap();
    }
    trie
}

pub fn trie_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("put");
    for count in [100u64, 1000] {
        let entries = keyed_entries(count);
        group.bench_function(criterion::BenchmarkId::from_parameter(count), |b| {
            b.iter_batched(
                || entries.clone(),
                |entries| {
                    let trie = Trie::new(Arc::new(MemoryDb::new()));
                    for (key, value) in &entries {
                        trie.put(key, value).unwrap();
                    }
                    black_box(trie.root())
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

pub fn trie_get(c: &mut Criterion) {
    let entries = keyed_entries(1000);
    let trie = populated(&entries);
    c.bench_function("get/1000", |b| {
        b.iter(|| {
            for (key, _) in &entries {
                black_box(trie.get(key).unwrap());
            }
        })
    });
}

criterion_group!(benches, trie_put, trie_get);
criterion_main!(benches);
