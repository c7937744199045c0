use criterion::{criterion_group, criterion_main, Criterion};
use ledger_core::{Block, MerkleTree, Transaction};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn sample_batch(count: usize) -> Vec<Transaction> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count)
        .map(|i| Transaction::new(format!("alice-{i}"), "bob", rng.gen_range(1..10)))
        .collect()
}

fn bench_pow(c: &mut Criterion) {
    let genesis = Block::genesis();
    let block = Block::new(sample_batch(10), Some(&genesis));

    c.bench_function("mine_difficulty_3", |b| {
        b.iter(|| {
            let mut candidate = block.clone();
            candidate.mine(3)
        });
    });

    c.bench_function("mine_parallel_difficulty_3", |b| {
        b.iter(|| {
            let mut candidate = block.clone();
            candidate.mine_parallel(3, None)
        });
    });
}

fn bench_merkle(c: &mut Criterion) {
    let records: Vec<Vec<u8>> = sample_batch(1000)
        .iter()
        .map(Transaction::canonical_bytes)
        .collect();

    c.bench_function("merkle_from_records_1000", |b| {
        b.iter(|| MerkleTree::from_records(&records).root_hash());
    });

    c.bench_function("merkle_append_100", |b| {
        b.iter(|| {
            let mut tree = MerkleTree::new();
            for record in &records[..100] {
                tree.append(record);
            }
            tree.root_hash()
        });
    });
}

criterion_group!(benches, bench_pow, bench_merkle);
criterion_main!(benches);
