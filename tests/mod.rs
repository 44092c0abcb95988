use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

mod bplus_tree;
mod hash_tree;
mod shared;

pub fn shuffled(range: std::ops::Range<u64>, seed: u64) -> Vec<u64> {
    let mut keys: Vec<u64> = range.collect();
    keys.shuffle(&mut StdRng::seed_from_u64(seed));
    keys
}

pub fn is_sorted<T: PartialOrd>(items: &[T]) -> bool {
    items.windows(2).all(|w| w[0] <= w[1])
}
