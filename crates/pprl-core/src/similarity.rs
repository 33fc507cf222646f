//! Set-similarity measures over equal-length bit vectors

use pprl_model::SimilarityMeasure;

use crate::bits::BitVector;

/// Dice coefficient: `2·|a∩b| / (|a| + |b|)`; 0 when both are empty.
pub fn dice(a: &BitVector, b: &BitVector) -> f64 {
    let (na, nb) = (a.count_ones(), b.count_ones());
    if na + nb == 0 {
        return 0.0;
    }

    2.0 * a.intersection_count(b) as f64 / (na + nb) as f64
}

/// Cosine similarity: `|a∩b| / sqrt(|a|·|b|)`; 0 when either is empty.
pub fn cosine(a: &BitVector, b: &BitVector) -> f64 {
    let (na, nb) = (a.count_ones(), b.count_ones());
    if na == 0 || nb == 0 {
        return 0.0;
    }

    a.intersection_count(b) as f64 / ((na * nb) as f64).sqrt()
}

/// Jaccard index: `|a∩b| / |a∪b|`; 0 when both are empty.
pub fn jaccard(a: &BitVector, b: &BitVector) -> f64 {
    let (na, nb) = (a.count_ones(), b.count_ones());
    let n_ab = a.intersection_count(b);
    let union = na + nb - n_ab;
    if union == 0 {
        return 0.0;
    }

    n_ab as f64 / union as f64
}

/// Dispatch on the configured measure.
pub fn similarity(measure: SimilarityMeasure, a: &BitVector, b: &BitVector) -> f64 {
    match measure {
        SimilarityMeasure::Dice => dice(a, b),
        SimilarityMeasure::Cosine => cosine(a, b),
        SimilarityMeasure::Jaccard => jaccard(a, b),
    }
}
