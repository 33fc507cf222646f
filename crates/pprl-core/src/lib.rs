//! pprl-core: Bloom-filter encoding and matching engine for
//! privacy-preserving record linkage
//!
//! Two parties holding disjoint record sets encode each record into a
//! fixed-length bit vector such that similar records yield similar
//! vectors while the original attribute values cannot be recovered; a
//! matching step then reports pairs above a similarity threshold.
//!
//! The pipeline is deterministic end to end: attribute values are
//! preprocessed ([`transform`]), tokenized into q-grams, hashed into bit
//! positions under a configured scheme and digest chain, assembled into a
//! CLK, RBF or CLK-RBF filter ([`mask`]), hardened, and finally compared
//! ([`match_vectors`]). Identical configurations, inputs and keys produce
//! byte-identical vectors across runs and hosts.
//!
//! # Determinism & seeded randomness
//!
//! All seeded operations use ChaCha8 (see the crate-private `rng`
//! module); the digest stream layout and position arithmetic are part of
//! the wire contract and covered by tests.
//!
//! # Error model
//!
//! Configuration problems surface once, before processing, as
//! [`Error::Validation`]. Per-entity input problems (transform contract
//! violations, empty values under the `error` policy, undecodable
//! vectors) carry the entity ID. Violated internal invariants (length
//! mismatches, out-of-range positions) panic with a diagnostic.

pub mod bits;
mod error;
pub mod harden;
pub mod hashing;
pub mod mask;
pub mod matching;
pub mod phonetics;
mod rng;
pub mod similarity;
pub mod stats;
pub mod tokens;
pub mod transform;

pub use bits::{optimal_size, BitVector};
pub use error::{Error, Result};
pub use mask::mask;
pub use matching::match_vectors;
pub use stats::{attribute_stats, compute_attribute_stats, AttributeStats};
pub use transform::transform;
