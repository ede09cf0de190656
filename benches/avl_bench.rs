#![feature(test)]
extern crate test;

use rand::{rngs::SmallRng, Rng, SeedableRng};
use test::Bencher;

use avl_index::avl::{Index, Tree};

const N_LOADS: u64 = 100_000;

fn load_tree(n: u64) -> Tree<u64, u64> {
    let mut rng = SmallRng::seed_from_u64(n);
    let mut tree = Tree::new();
    for _ in 0..n {
        let key = rng.gen::<u64>();
        tree.set(key, key);
    }
    tree
}

#[bench]
fn bench_tree_set(b: &mut Bencher) {
    let mut rng = SmallRng::seed_from_u64(0x1234);
    let mut tree = load_tree(N_LOADS);
    b.iter(|| {
        let key = rng.gen::<u64>();
        tree.set(key, key)
    });
}

#[bench]
fn bench_tree_get(b: &mut Bencher) {
    let mut rng = SmallRng::seed_from_u64(N_LOADS);
    let keys: Vec<u64> = (0..N_LOADS).map(|_| rng.gen()).collect();
    let tree = load_tree(N_LOADS);
    let mut off = 0;
    b.iter(|| {
        off = (off + 1) % keys.len();
        tree.get(&keys[off]).is_some()
    });
}

#[bench]
fn bench_tree_remove(b: &mut Bencher) {
    let mut rng = SmallRng::seed_from_u64(N_LOADS);
    let keys: Vec<u64> = (0..N_LOADS).map(|_| rng.gen()).collect();
    let mut tree = load_tree(N_LOADS);
    let mut off = 0;
    b.iter(|| {
        off = (off + 1) % keys.len();
        let key = keys[off];
        tree.remove(&key).map(|value| tree.set(key, value))
    });
}

#[bench]
fn bench_tree_range(b: &mut Bencher) {
    let mut rng = SmallRng::seed_from_u64(0x4321);
    let tree = load_tree(N_LOADS);
    b.iter(|| {
        let from = rng.gen::<u64>();
        let till = from.saturating_add(u64::MAX / N_LOADS * 100);
        tree.range(&from, &till, true).count()
    });
}

#[bench]
fn bench_tree_compact(b: &mut Bencher) {
    let mut rng = SmallRng::seed_from_u64(0x5678);
    let keys: Vec<u64> = load_tree(10_000).iter().map(|(k, _)| *k).collect();
    b.iter(|| {
        let mut tree = load_tree(10_000);
        let dels: Vec<u64> = keys.iter().filter(|_| rng.gen::<u8>() < 64).copied().collect();
        tree.delete(dels.iter());
        tree.compact()
    });
}

#[bench]
fn bench_index_get(b: &mut Bencher) {
    let mut rng = SmallRng::seed_from_u64(N_LOADS);
    let keys: Vec<u64> = (0..N_LOADS).map(|_| rng.gen()).collect();
    let index: Index<u64, u64> = Index::new("bench_index_get");
    index.set_many(keys.iter().map(|k| (*k, *k)).collect());
    let mut off = 0;
    b.iter(|| {
        off = (off + 1) % keys.len();
        index.get(&keys[off])
    });
}
