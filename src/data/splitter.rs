// ============================================================
// Layer 4 — Train/Test Splitter
// ============================================================
// Shuffles the encoded windows and cuts them into a training
// set and a held-out test set.
//
//   ratio:   80% train / 20% test (fixed)
//   shuffle: Fisher-Yates with a seeded StdRng, so the same
//            corpus + seed always yields the same split and a
//            resumed run evaluates on the same held-out windows
//
// Reference: rand crate documentation (SliceRandom, SeedableRng)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Share of samples that goes to the training set.
pub const TRAIN_FRACTION: f64 = 0.8;

/// Shuffle `samples` with `seed` and split into (train, test).
pub fn split_train_test<T>(mut samples: Vec<T>, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let split_at = ((total as f64) * TRAIN_FRACTION).round() as usize;
    let split_at = split_at.min(total);

    let test = samples.split_off(split_at);

    tracing::debug!("Dataset split: {} train, {} test", samples.len(), test.len());
    (samples, test)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_split_sizes() {
        let (train, test) = split_train_test((0..100).collect::<Vec<usize>>(), 7);
        assert_eq!(train.len(), 80);
        assert_eq!(test.len(),  20);
    }

    #[test]
    fn test_splits_are_disjoint_and_complete() {
        let (train, test) = split_train_test((0..50).collect::<Vec<usize>>(), 3);
        let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = split_train_test((0..30).collect::<Vec<usize>>(), 42);
        let b = split_train_test((0..30).collect::<Vec<usize>>(), 42);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_dataset() {
        let (train, test) = split_train_test(Vec::<usize>::new(), 1);
        assert!(train.is_empty());
        assert!(test.is_empty());
    }
}
