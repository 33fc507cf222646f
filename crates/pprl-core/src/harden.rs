//! Hardeners: pure bit-vector transforms applied after masking
//!
//! Each hardener maps a vector to a new vector; the configured chain is
//! applied in declared order. Lengths are preserved except where
//! documented (balance doubles, xor-fold halves).

use rand::Rng;

use pprl_model::HardenerConfig;

use crate::bits::BitVector;
use crate::rng;

/// Append the bitwise complement: the output has twice the length and
/// exactly half of its bits set, irrespective of input density.
pub fn balance(v: &BitVector) -> BitVector {
    v.concat(&!v)
}

/// XOR the two halves together, halving the length. An odd-length input
/// gets one zero bit appended first.
pub fn xor_fold(v: &BitVector) -> BitVector {
    let padded;
    let v = if v.len() % 2 == 1 {
        padded = v.concat(&BitVector::new(1));
        &padded
    } else {
        v
    };

    &v.left_half() ^ &v.right_half()
}

/// Fisher-Yates shuffle of bit positions under the given seed. The
/// popcount is preserved and the permutation is invertible.
pub fn permute(v: &BitVector, seed: u64) -> BitVector {
    let indices = rng::shuffled_indices(v.len(), &mut rng::seeded(seed));

    let mut out = BitVector::new(v.len());
    for (i, &src) in indices.iter().enumerate() {
        if v.test(src) {
            out.set(i);
        }
    }

    out
}

/// Replace each bit independently with a fresh uniform random bit with
/// probability `probability`; keep it otherwise. `0.0` is a no-op, `1.0`
/// yields a vector independent of the input.
pub fn randomized_response(v: &BitVector, seed: u64, probability: f64) -> BitVector {
    let mut rng = rng::seeded(seed);
    let mut out = BitVector::new(v.len());

    for i in 0..v.len() {
        let bit = if rng.gen::<f64>() < probability {
            rng.gen::<bool>()
        } else {
            v.test(i)
        };

        if bit {
            out.set(i);
        }
    }

    out
}

/// Elementary cellular automaton rule 90, applied once: each bit becomes
/// the XOR of its neighbors, with zero beyond both boundaries.
pub fn rule_90(v: &BitVector) -> BitVector {
    let n = v.len();
    let mut out = BitVector::new(n);

    for i in 0..n {
        let left = i > 0 && v.test(i - 1);
        let right = i + 1 < n && v.test(i + 1);

        if left != right {
            out.set(i);
        }
    }

    out
}

/// Slide a window across the vector; each window's bits, read as a
/// big-endian integer, seed an RNG that draws `samples` positions to set
/// in an accumulator. The result is the input OR the accumulator, so set
/// bits are never lost. Windows extending past the end are dropped.
pub fn rehash(v: &BitVector, window_size: usize, window_step: usize, samples: usize) -> BitVector {
    let n = v.len();
    let mut accumulator = BitVector::new(n);

    let mut start = 0;
    while start + window_size <= n {
        let mut seed = 0u64;
        for i in start..start + window_size {
            seed = (seed << 1) | v.test(i) as u64;
        }

        let mut rng = rng::seeded(seed);
        for _ in 0..samples {
            accumulator.set(rng.gen_range(0..n));
        }

        start += window_step;
    }

    v | &accumulator
}

/// Apply a configured hardener chain in declared order.
pub fn apply_chain(chain: &[HardenerConfig], v: BitVector) -> BitVector {
    chain.iter().fold(v, |v, hardener| match *hardener {
        HardenerConfig::Balance => balance(&v),
        HardenerConfig::XorFold => xor_fold(&v),
        HardenerConfig::Permute { seed } => permute(&v, seed),
        HardenerConfig::RandomizedResponse { seed, probability } => {
            randomized_response(&v, seed, probability)
        }
        HardenerConfig::Rule90 => rule_90(&v),
        HardenerConfig::Rehash {
            window_size,
            window_step,
            samples,
        } => rehash(&v, window_size, window_step, samples),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vector() -> BitVector {
        let mut v = BitVector::new(64);
        for i in [0, 3, 5, 11, 17, 23, 24, 30, 31, 40, 41, 42, 50, 63] {
            v.set(i);
        }
        v
    }

    #[test]
    fn test_balance() {
        let v = BitVector::from_bit_string("1010").unwrap();
        assert_eq!(balance(&v).to_string(), "10100101");
    }

    #[test]
    fn test_balance_equalizes_density() {
        let mut v = BitVector::new(64);
        for i in 0..27 {
            v.set(i);
        }

        let balanced = balance(&v);
        assert_eq!(balanced.len(), 128);
        assert_eq!(balanced.count_ones(), 64);
    }

    #[test]
    fn test_xor_fold() {
        let v = BitVector::from_bit_string("1111111110100011").unwrap();
        assert_eq!(xor_fold(&v).to_string(), "01011100");
    }

    #[test]
    fn test_xor_fold_pads_odd_length() {
        let v = BitVector::from_bit_string("111111111010001").unwrap();
        assert_eq!(xor_fold(&v).to_string(), "01011101");
    }

    #[test]
    fn test_permute_preserves_popcount() {
        let v = sample_vector();
        let permuted = permute(&v, 727);

        assert_eq!(permuted.len(), v.len());
        assert_eq!(permuted.count_ones(), v.count_ones());
        assert_ne!(permuted, v);
    }

    #[test]
    fn test_permute_same_seed_same_output() {
        let v = sample_vector();

        assert_eq!(permute(&v, 123), permute(&v, 123));
        assert_ne!(permute(&v, 123), permute(&v, 456));
    }

    #[test]
    fn test_permute_inverse_recovers_input() {
        let v = sample_vector();
        let permuted = permute(&v, 727);

        let indices = crate::rng::shuffled_indices(v.len(), &mut crate::rng::seeded(727));
        let mut recovered = BitVector::new(v.len());
        for (i, &src) in indices.iter().enumerate() {
            if permuted.test(i) {
                recovered.set(src);
            }
        }

        assert_eq!(recovered, v);
    }

    #[test]
    fn test_randomized_response_zero_probability_is_identity() {
        let v = sample_vector();
        assert_eq!(randomized_response(&v, 42, 0.0), v);
    }

    #[test]
    fn test_randomized_response_full_probability_ignores_input() {
        let v = sample_vector();
        let other = !&sample_vector();

        assert_eq!(randomized_response(&v, 42, 1.0), randomized_response(&other, 42, 1.0));
    }

    #[test]
    fn test_randomized_response_is_deterministic() {
        let v = sample_vector();

        assert_eq!(randomized_response(&v, 42, 0.5), randomized_response(&v, 42, 0.5));
        assert_ne!(randomized_response(&v, 42, 0.5), v);
    }

    #[test]
    fn test_rule_90() {
        let v = BitVector::from_bit_string("10010").unwrap();
        assert_eq!(rule_90(&v).to_string(), "01101");

        let v = BitVector::from_bit_string("0110101").unwrap();
        assert_eq!(rule_90(&v).to_string(), "1110000");
    }

    #[test]
    fn test_rule_90_preserves_length() {
        let v = sample_vector();
        assert_eq!(rule_90(&v).len(), v.len());
    }

    #[test]
    fn test_rehash_is_a_superset_of_the_input() {
        let v = sample_vector();
        let rehashed = rehash(&v, 8, 8, 3);

        assert_eq!(rehashed.len(), v.len());
        assert_eq!(&rehashed & &v, v);
        assert!(rehashed.count_ones() > v.count_ones());
    }

    #[test]
    fn test_rehash_is_deterministic() {
        let v = sample_vector();

        assert_eq!(rehash(&v, 8, 8, 3), rehash(&v, 8, 8, 3));
        assert_ne!(rehash(&v, 8, 8, 3), rehash(&v, 16, 8, 3));
    }

    #[test]
    fn test_chain_applies_in_order() {
        let v = BitVector::from_bit_string("1010").unwrap();
        let chain = [HardenerConfig::Balance, HardenerConfig::XorFold];

        // balance("1010") = "10100101", folded back to "1111".
        assert_eq!(apply_chain(&chain, v).to_string(), "1111");
    }
}
