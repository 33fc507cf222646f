//! Seeded randomness
//!
//! Every seeded operation in the engine (permutation, randomized
//! response, rehashing, RBF bit sampling, the random hash scheme) draws
//! from ChaCha8. Its output stream is specified independently of the
//! platform, so identical seeds produce identical bit sequences on every
//! host.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub(crate) fn seeded(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Fisher-Yates shuffle of `0..len`.
pub(crate) fn shuffled_indices(len: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..len).collect();

    for i in (1..len).rev() {
        let j = rng.gen_range(0..=i);
        indices.swap(i, j);
    }

    indices
}
