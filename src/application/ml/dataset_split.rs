use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

pub const TEST_FRACTION: f64 = 0.2;
pub const SPLIT_SEED: u64 = 42;

/// Row indices of each partition, in shuffled order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffles `0..n` with a seeded generator and takes the first
/// `ceil(test_fraction * n)` indices as the test partition.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> TrainTestSplit {
    let n_test = ((n as f64) * test_fraction).ceil() as usize;
    let n_test = n_test.min(n);

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    TrainTestSplit {
        train,
        test: indices,
    }
}

/// Picks `rows` out of `items` in the given order.
pub fn select<T: Clone>(items: &[T], rows: &[usize]) -> Vec<T> {
    rows.iter().map(|&i| items[i].clone()).collect()
}
