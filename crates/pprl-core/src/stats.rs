//! Attribute statistics for weight estimation
//!
//! Over a sample population, each attribute gets its average token count
//! and the Shannon entropy of its q-gram distribution. Both feed the
//! weighted filter configurations (RBF / CLK-RBF).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use pprl_model::{Entity, TransformRequest};

use crate::error::Result;
use crate::tokens::{token_count, tokenize};
use crate::transform;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttributeStats {
    /// Mean number of q-grams per present value.
    pub average_tokens: f64,
    /// `-Σ p(g)·log2 p(g)` over the observed q-gram distribution.
    pub ngram_entropy: f64,
}

/// Statistics over already-transformed entities.
pub fn attribute_stats(
    entities: &[Entity],
    token_size: usize,
    padding: &str,
) -> BTreeMap<String, AttributeStats> {
    let mut value_counts: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    let mut gram_counts: BTreeMap<&str, BTreeMap<String, usize>> = BTreeMap::new();

    for entity in entities {
        for (name, value) in &entity.attributes {
            value_counts
                .entry(name)
                .or_default()
                .push(token_count(value, token_size, padding));

            let grams = gram_counts.entry(name).or_default();
            for gram in tokenize(value, token_size, padding) {
                *grams.entry(gram).or_default() += 1;
            }
        }
    }

    value_counts
        .into_iter()
        .map(|(name, counts)| {
            let average_tokens = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
            let ngram_entropy = entropy(&gram_counts[name]);

            (
                name.to_string(),
                AttributeStats {
                    average_tokens,
                    ngram_entropy,
                },
            )
        })
        .collect()
}

/// Run the transform pipeline first, then compute statistics on the
/// preprocessed values.
pub fn compute_attribute_stats(
    req: &TransformRequest,
    token_size: usize,
    padding: &str,
) -> Result<BTreeMap<String, AttributeStats>> {
    let transformed = transform::transform(req)?;
    Ok(attribute_stats(&transformed.entities, token_size, padding))
}

fn entropy(counts: &BTreeMap<String, usize>) -> f64 {
    let total: usize = counts.values().sum();
    if total == 0 {
        return 0.0;
    }

    -counts
        .values()
        .map(|&count| {
            let p = count as f64 / total as f64;
            p * p.log2()
        })
        .sum::<f64>()
}
