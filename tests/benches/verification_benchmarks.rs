//! # Verification Benchmarks
//!
//! Leaf hashing and subtree roots, sequential against rayon-parallel.
//!
//! | Operation | Input |
//! |-----------|-------|
//! | `hash_leaves` | block of N items |
//! | `root_of` | N leaves |
//! | `root_of_parallel` | N leaves, batch 32 |

use bn_03_verification::domain::{hash_leaves, hash_leaves_parallel, root_of_parallel};
use bn_03_verification::root_of;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::RngCore;
use shared_crypto::sha384_hash;
use shared_types::{BlockHash, BlockHeader, BlockItem, ItemKind, ZERO_HASH};

const SIZES: [usize; 4] = [64, 512, 4_096, 32_768];
const BATCH_SIZE: usize = 32;

fn random_leaves(count: usize) -> Vec<BlockHash> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| {
            let mut seed = [0u8; 32];
            rng.fill_bytes(&mut seed);
            sha384_hash(&seed)
        })
        .collect()
}

fn random_block(body_len: usize) -> Vec<BlockItem> {
    let mut rng = rand::thread_rng();
    let mut items = vec![BlockItem::header(&BlockHeader::new(1, ZERO_HASH)).unwrap()];
    items.extend((0..body_len).map(|i| {
        let mut payload = vec![0u8; 256];
        rng.fill_bytes(&mut payload);
        let kind = if i % 2 == 0 {
            ItemKind::EventTransaction
        } else {
            ItemKind::TransactionResult
        };
        BlockItem::other(kind, payload)
    }));
    items
}

fn bench_subtree_roots(c: &mut Criterion) {
    let mut group = c.benchmark_group("subtree-root");
    for size in SIZES {
        let leaves = random_leaves(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("sequential", size), &leaves, |b, leaves| {
            b.iter(|| black_box(root_of(leaves)))
        });
        group.bench_with_input(BenchmarkId::new("parallel", size), &leaves, |b, leaves| {
            b.iter(|| black_box(root_of_parallel(leaves, BATCH_SIZE)))
        });
    }
    group.finish();
}

fn bench_leaf_hashing(c: &mut Criterion) {
    let mut group = c.benchmark_group("leaf-hashing");
    for size in [64, 1_024, 8_192] {
        let items = random_block(size);
        group.throughput(Throughput::Elements(items.len() as u64));
        group.bench_with_input(BenchmarkId::new("sequential", size), &items, |b, items| {
            b.iter(|| black_box(hash_leaves(1, items).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("parallel", size), &items, |b, items| {
            b.iter(|| black_box(hash_leaves_parallel(1, items).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_subtree_roots, bench_leaf_hashing);
criterion_main!(benches);
