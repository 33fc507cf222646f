//! pprl-model: wire and configuration model for the PPRL engine
//!
//! Every request, response and configuration object exchanged between the
//! client, the service and the core engine lives here. The discriminated
//! unions (filter type, hash strategy, hardener, transformer) are tagged
//! serde enums; their wire tags double as the configuration schema.
//!
//! Structural validation (field bounds, mutually exclusive options,
//! attribute presence on entities) happens once per request through the
//! `validate()` methods, before any processing starts.

mod common;
mod error;
mod mask;
mod matching;
mod transform;

pub use common::{BitVectorEntity, Entity, HealthResponse};
pub use error::ValidationError;
pub use mask::{
    AttributeConfig, AttributeSalt, Filter, FilterType, HardenerConfig, HashAlgorithm, HashConfig,
    HashFunction, HashStrategy, MaskConfig, MaskRequest, MaskResponse, StaticAttributeConfig,
    WeightedAttributeConfig,
};
pub use matching::{Match, MatchConfig, MatchMethod, MatchRequest, MatchResponse, SimilarityMeasure};
pub use transform::{
    AttributeTransformerConfig, EmptyValueHandling, GlobalTransformerConfig, PhoneticCodeAlgorithm,
    TransformConfig, TransformRequest, TransformResponse, Transformer,
};
