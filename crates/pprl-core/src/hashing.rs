//! Token digestion and bit position schemes
//!
//! A token is digested by every configured algorithm (HMAC-keyed when a
//! key is present); the concatenated digests form the token's *digest
//! stream*. The stream's leading bytes seed the position schemes, so the
//! algorithm order is part of the wire contract: reordering algorithms
//! changes every output vector.

use hmac::{Hmac, Mac};
use md5::Md5;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use pprl_model::{HashAlgorithm, HashFunction, HashStrategy};

/// Resolved digest configuration, applied to every token of a masking job.
#[derive(Debug, Clone)]
pub struct TokenHasher {
    algorithms: Vec<HashAlgorithm>,
    key: Option<Vec<u8>>,
}

impl TokenHasher {
    pub fn new(function: &HashFunction) -> Self {
        Self {
            algorithms: function.algorithms.clone(),
            key: function.key.as_ref().map(|k| k.as_bytes().to_vec()),
        }
    }

    /// Concatenation of all configured digests over `data`, in order.
    pub fn digest_stream(&self, data: &[u8]) -> Vec<u8> {
        let capacity = self.algorithms.iter().map(|a| a.digest_size()).sum();
        let mut stream = Vec::with_capacity(capacity);

        for algorithm in &self.algorithms {
            match &self.key {
                None => stream.extend_from_slice(&plain_digest(*algorithm, data)),
                Some(key) => stream.extend_from_slice(&hmac_digest(*algorithm, key, data)),
            }
        }

        stream
    }
}

fn plain_digest(algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    match algorithm {
        HashAlgorithm::Md5 => Md5::digest(data).to_vec(),
        HashAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
        HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
        HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
    }
}

fn hmac_digest(algorithm: HashAlgorithm, key: &[u8], data: &[u8]) -> Vec<u8> {
    // new_from_slice is infallible for HMAC: any key length is valid.
    match algorithm {
        HashAlgorithm::Md5 => {
            let mut mac = Hmac::<Md5>::new_from_slice(key).expect("HMAC accepts any key length");
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
        HashAlgorithm::Sha1 => {
            let mut mac = Hmac::<Sha1>::new_from_slice(key).expect("HMAC accepts any key length");
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
        HashAlgorithm::Sha256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts any key length");
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
        HashAlgorithm::Sha512 => {
            let mut mac = Hmac::<Sha512>::new_from_slice(key).expect("HMAC accepts any key length");
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
    }
}

/// Little-endian u32 at byte offset `i` of the digest stream. The
/// smallest digest (md5) is 16 bytes, so offsets 0, 4 and 8 always exist.
fn le_u32(stream: &[u8], i: usize) -> u64 {
    let chunk: [u8; 4] = stream[i..i + 4]
        .try_into()
        .expect("digest stream shorter than seed extraction window");
    u32::from_le_bytes(chunk) as u64
}

/// `(j³ - j) / 6`, the enhanced-double-hashing cubic term. Wrapping u64,
/// like all position arithmetic.
fn cubic_term(j: u64) -> u64 {
    j.wrapping_mul(j).wrapping_mul(j).wrapping_sub(j) / 6
}

/// Compute the `k` bit positions for a token under the given scheme.
/// Arithmetic is wrapping u64, reduced modulo `filter_size`.
pub fn bit_positions(
    strategy: HashStrategy,
    k: u32,
    stream: &[u8],
    filter_size: usize,
) -> Vec<usize> {
    let m = filter_size as u64;

    match strategy {
        HashStrategy::DoubleHash => {
            let (h0, h1) = (le_u32(stream, 0), le_u32(stream, 4));
            (0..k as u64)
                .map(|j| (h0.wrapping_add(j.wrapping_mul(h1)) % m) as usize)
                .collect()
        }
        HashStrategy::EnhancedDoubleHash => {
            let (h0, h1) = (le_u32(stream, 0), le_u32(stream, 4));
            (0..k as u64)
                .map(|j| {
                    (h0.wrapping_add(j.wrapping_mul(h1)).wrapping_add(cubic_term(j)) % m) as usize
                })
                .collect()
        }
        HashStrategy::TripleHash => {
            let (h0, h1, h2) = (le_u32(stream, 0), le_u32(stream, 4), le_u32(stream, 8));
            (0..k as u64)
                .map(|j| {
                    (h0.wrapping_add(j.wrapping_mul(h1))
                        .wrapping_add(cubic_term(j).wrapping_mul(h2))
                        % m) as usize
                })
                .collect()
        }
        HashStrategy::RandomHash => {
            // The stream's first 32 bytes (zero-padded) are the full RNG
            // seed; extra digest algorithms widen the usable state.
            let mut seed = [0u8; 32];
            let n = stream.len().min(32);
            seed[..n].copy_from_slice(&stream[..n]);

            let mut rng = ChaCha8Rng::from_seed(seed);
            (0..k).map(|_| rng.gen_range(0..filter_size)).collect()
        }
    }
}
