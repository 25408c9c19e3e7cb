use rand::Rng;
use rand::seq::SliceRandom;

/// Draw `min(n, pool.len())` items without replacement.
///
/// Works on a vector of references so the pool itself is never reordered.
/// `partial_shuffle` runs the first `n` steps of a Fisher–Yates shuffle,
/// which makes every ordered selection equally likely.
pub fn sample<T: Clone, R: Rng + ?Sized>(pool: &[T], n: usize, rng: &mut R) -> Vec<T> {
    let amount = n.min(pool.len());
    if amount == 0 {
        return Vec::new();
    }
    let mut refs: Vec<&T> = pool.iter().collect();
    let (picked, _) = refs.partial_shuffle(rng, amount);
    picked.iter().map(|&item| item.clone()).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn returns_requested_count_without_duplicates() {
        let pool: Vec<u32> = (0..20).collect();
        let mut rng = SmallRng::seed_from_u64(42);
        let picked = sample(&pool, 8, &mut rng);
        assert_eq!(picked.len(), 8);
        let unique: HashSet<u32> = picked.iter().copied().collect();
        assert_eq!(unique.len(), 8);
        assert!(picked.iter().all(|x| pool.contains(x)));
    }

    #[test]
    fn clamps_to_pool_size() {
        let pool = vec!["a", "b", "c"];
        let mut rng = SmallRng::seed_from_u64(3);
        let mut picked = sample(&pool, 10, &mut rng);
        picked.sort();
        assert_eq!(picked, pool);
    }

    #[test]
    fn empty_inputs_yield_empty_output() {
        let mut rng = SmallRng::seed_from_u64(0);
        let empty: Vec<u8> = Vec::new();
        assert!(sample(&empty, 5, &mut rng).is_empty());
        assert!(sample(&[1, 2, 3], 0, &mut rng).is_empty());
    }

    #[test]
    fn source_pool_is_untouched() {
        let pool: Vec<u32> = (0..50).collect();
        let before = pool.clone();
        let mut rng = SmallRng::seed_from_u64(9);
        for _ in 0..10 {
            let _ = sample(&pool, 25, &mut rng);
        }
        assert_eq!(pool, before);
    }

    #[test]
    fn same_seed_same_selection() {
        let pool: Vec<u32> = (0..30).collect();
        let a = sample(&pool, 10, &mut SmallRng::seed_from_u64(11));
        let b = sample(&pool, 10, &mut SmallRng::seed_from_u64(11));
        assert_eq!(a, b);
    }

    #[test]
    fn orderings_are_roughly_uniform() {
        // 3 items, full permutation: 6 orderings, each expected ~1/6.
        let pool = [0u8, 1, 2];
        let mut rng = SmallRng::seed_from_u64(2024);
        let trials = 60_000;
        let mut counts: HashMap<Vec<u8>, usize> = HashMap::new();
        for _ in 0..trials {
            *counts.entry(sample(&pool, 3, &mut rng)).or_default() += 1;
        }
        assert_eq!(counts.len(), 6);
        let expected = trials as f64 / 6.0;
        for (ordering, count) in &counts {
            let deviation = (*count as f64 - expected).abs() / expected;
            assert!(deviation < 0.05, "ordering {ordering:?} drawn {count} times");
        }
    }

    #[test]
    fn every_item_equally_likely_to_be_picked() {
        let pool: Vec<usize> = (0..10).collect();
        let mut rng = SmallRng::seed_from_u64(77);
        let trials = 20_000;
        let mut hits = [0usize; 10];
        for _ in 0..trials {
            for i in sample(&pool, 3, &mut rng) {
                hits[i] += 1;
            }
        }
        let expected = trials as f64 * 3.0 / 10.0;
        for (i, &h) in hits.iter().enumerate() {
            let deviation = (h as f64 - expected).abs() / expected;
            assert!(deviation < 0.05, "item {i} picked {h} times");
        }
    }
}
