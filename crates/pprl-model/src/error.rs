//! Validation error type

use thiserror::Error;

/// A structural problem in a request, detected before any processing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("request contains no entities")]
    NoEntities,

    #[error("attribute and global transformers are empty: must contain at least one")]
    NoTransformers,

    #[error("hash function requires at least one algorithm")]
    NoHashAlgorithms,

    #[error("token size must be greater than 1, is {0}")]
    InvalidTokenSize(usize),

    #[error("{field} must be positive, is {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("probability must be in [0, 1], is {0}")]
    InvalidProbability(f64),

    #[error("threshold must be in [0, 1], is {0}")]
    InvalidThreshold(f64),

    #[error("rehash window size must be in [1, 64], is {0}")]
    InvalidWindowSize(usize),

    #[error("salt: value and attribute cannot be set at the same time")]
    SaltOverspecified,

    #[error("salt: neither value nor attribute is set")]
    SaltUnderspecified,

    #[error("`{filter}` filters require static attribute configurations, but weighted ones were found")]
    StaticAttributesExpected { filter: String },

    #[error("`{filter}` filters require weighted attribute configurations, but none or static ones were found")]
    WeightedAttributesExpected { filter: String },

    #[error("some configured attributes are not present on entities: {0}")]
    AttributesMissing(String),

    #[error("some configured attribute salts are not present on entities: {0}")]
    SaltAttributesMissing(String),

    #[error("pairwise matching requires equally sized collections, got {domain} and {range}")]
    PairwiseLengthMismatch { domain: usize, range: usize },
}
