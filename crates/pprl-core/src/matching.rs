//! Matching driver: compare two collections of encoded vectors and emit
//! the pairs above the similarity threshold.

use std::collections::BTreeSet;

use pprl_model::{BitVectorEntity, Match, MatchMethod, MatchRequest, MatchResponse};

use crate::bits::BitVector;
use crate::error::{Error, Result};
use crate::similarity::similarity;

/// Decode a collection, accumulating the IDs of undecodable entries.
fn decode_all<'a>(
    entities: &'a [BitVectorEntity],
    failed: &mut BTreeSet<String>,
) -> Vec<(&'a BitVectorEntity, BitVector)> {
    entities
        .iter()
        .filter_map(|entity| match BitVector::from_base64(&entity.value) {
            Ok(vector) => Some((entity, vector)),
            Err(_) => {
                failed.insert(entity.id.clone());
                None
            }
        })
        .collect()
}

/// Run a matching request. All vectors are decoded up front; a single
/// malformed value or length mismatch fails the request before any pair
/// is compared.
pub fn match_vectors(req: &MatchRequest) -> Result<MatchResponse> {
    req.validate()?;

    let mut failed = BTreeSet::new();
    let domain = decode_all(&req.domain, &mut failed);
    let range = decode_all(&req.range, &mut failed);

    if !failed.is_empty() {
        let ids: Vec<&str> = failed.iter().map(String::as_str).collect();
        return Err(Error::Decode(ids.join(", ")));
    }

    let expected = domain[0].1.len();
    for (entity, vector) in domain.iter().chain(range.iter()) {
        if vector.len() != expected {
            return Err(Error::LengthMismatch {
                entity_id: entity.id.clone(),
                expected,
                actual: vector.len(),
            });
        }
    }

    let measure = req.config.measure;
    let threshold = req.config.threshold;
    let mut matches = Vec::new();

    let mut emit = |(d, dv): &(&BitVectorEntity, BitVector), (r, rv): &(&BitVectorEntity, BitVector)| {
        let score = similarity(measure, dv, rv);
        if score >= threshold {
            matches.push(Match {
                domain: (*d).clone(),
                range: (*r).clone(),
                similarity: score,
            });
        }
    };

    match req.config.method {
        MatchMethod::Crosswise => {
            for d in &domain {
                for r in &range {
                    emit(d, r);
                }
            }
        }
        MatchMethod::Pairwise => {
            for (d, r) in domain.iter().zip(range.iter()) {
                emit(d, r);
            }
        }
    }

    Ok(MatchResponse {
        config: req.config,
        matches,
    })
}
