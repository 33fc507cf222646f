//! Matching configuration and results

use serde::{Deserialize, Serialize};

use crate::common::BitVectorEntity;
use crate::error::ValidationError;

/// Set-similarity measure over two bit vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMeasure {
    Dice,
    Cosine,
    Jaccard,
}

/// How the two collections are paired up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMethod {
    /// Full Cartesian product of domain and range.
    #[default]
    Crosswise,
    /// Index-aligned comparison; collections must be equally sized.
    Pairwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchConfig {
    pub measure: SimilarityMeasure,
    pub threshold: f64,
    #[serde(default)]
    pub method: MatchMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchRequest {
    pub config: MatchConfig,
    pub domain: Vec<BitVectorEntity>,
    pub range: Vec<BitVectorEntity>,
}

impl MatchRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.domain.is_empty() || self.range.is_empty() {
            return Err(ValidationError::NoEntities);
        }

        if !(0.0..=1.0).contains(&self.config.threshold) {
            return Err(ValidationError::InvalidThreshold(self.config.threshold));
        }

        if self.config.method == MatchMethod::Pairwise && self.domain.len() != self.range.len() {
            return Err(ValidationError::PairwiseLengthMismatch {
                domain: self.domain.len(),
                range: self.range.len(),
            });
        }

        Ok(())
    }
}

/// One emitted pair with its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub domain: BitVectorEntity,
    pub range: BitVectorEntity,
    pub similarity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResponse {
    pub config: MatchConfig,
    pub matches: Vec<Match>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: MatchMethod, threshold: f64) -> MatchRequest {
        MatchRequest {
            config: MatchConfig {
                measure: SimilarityMeasure::Jaccard,
                threshold,
                method,
            },
            domain: vec![BitVectorEntity::new("d1", "qg==")],
            range: vec![
                BitVectorEntity::new("r1", "qg=="),
                BitVectorEntity::new("r2", "VQ=="),
            ],
        }
    }

    #[test]
    fn test_measure_tags() {
        assert_eq!(serde_json::to_string(&SimilarityMeasure::Dice).unwrap(), "\"dice\"");
        assert_eq!(
            serde_json::from_str::<SimilarityMeasure>("\"jaccard\"").unwrap(),
            SimilarityMeasure::Jaccard
        );
    }

    #[test]
    fn test_method_defaults_to_crosswise() {
        let config: MatchConfig =
            serde_json::from_str(r#"{"measure":"dice","threshold":0.8}"#).unwrap();
        assert_eq!(config.method, MatchMethod::Crosswise);
    }

    #[test]
    fn test_validate_threshold_bounds() {
        assert!(matches!(
            request(MatchMethod::Crosswise, 1.5).validate(),
            Err(ValidationError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_validate_pairwise_lengths() {
        assert!(matches!(
            request(MatchMethod::Pairwise, 0.8).validate(),
            Err(ValidationError::PairwiseLengthMismatch { domain: 1, range: 2 })
        ));
    }
}
