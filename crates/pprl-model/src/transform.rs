//! Transform pipeline configuration

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::common::Entity;
use crate::error::ValidationError;

/// Policy for attribute values that are empty after the global *before*
/// transforms have run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyValueHandling {
    /// Feed the empty string through the remaining transforms.
    Ignore,
    /// Drop the attribute from the output entity.
    Skip,
    /// Fail the entity.
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformConfig {
    pub empty_value: EmptyValueHandling,
    /// When set, an entity that fails a transform is dropped from the
    /// output instead of failing the whole batch.
    #[serde(default)]
    pub drop_failed_entities: bool,
}

/// Phonetic encoding schemes supported by the `phonetic_code` transformer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhoneticCodeAlgorithm {
    Soundex,
    Metaphone,
    RefinedSoundex,
    Cologne,
}

/// A single value-to-value transform. The `name` tag is the wire schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Transformer {
    Normalization,
    DateTime {
        input_format: String,
        output_format: String,
    },
    CharacterFilter {
        /// Code points to remove; ASCII punctuation when absent.
        #[serde(default)]
        characters: Option<String>,
    },
    Mapping {
        mapping: BTreeMap<String, String>,
        #[serde(default)]
        default_value: Option<String>,
        #[serde(default)]
        inline: bool,
    },
    Number {
        decimal_places: usize,
    },
    PhoneticCode {
        algorithm: PhoneticCodeAlgorithm,
    },
}

/// Transforms applied to one named attribute, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeTransformerConfig {
    pub attribute_name: String,
    pub transformers: Vec<Transformer>,
}

/// Transforms applied to every attribute, before and after the
/// per-attribute lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalTransformerConfig {
    #[serde(default)]
    pub before: Vec<Transformer>,
    #[serde(default)]
    pub after: Vec<Transformer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformRequest {
    pub config: TransformConfig,
    #[serde(default)]
    pub attribute_transformers: Vec<AttributeTransformerConfig>,
    #[serde(default)]
    pub global_transformers: GlobalTransformerConfig,
    pub entities: Vec<Entity>,
}

impl TransformRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.entities.is_empty() {
            return Err(ValidationError::NoEntities);
        }

        let global_count = self.global_transformers.before.len() + self.global_transformers.after.len();
        if self.attribute_transformers.is_empty() && global_count == 0 {
            return Err(ValidationError::NoTransformers);
        }

        if self
            .attribute_transformers
            .iter()
            .any(|a| a.transformers.is_empty())
        {
            return Err(ValidationError::NoTransformers);
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformResponse {
    pub config: TransformConfig,
    pub entities: Vec<Entity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TransformConfig {
        TransformConfig {
            empty_value: EmptyValueHandling::Ignore,
            drop_failed_entities: false,
        }
    }

    #[test]
    fn test_transformer_tags() {
        let json = serde_json::to_string(&Transformer::Normalization).unwrap();
        assert_eq!(json, r#"{"name":"normalization"}"#);

        let tf = Transformer::Number { decimal_places: 2 };
        let json = serde_json::to_string(&tf).unwrap();
        assert_eq!(json, r#"{"name":"number","decimal_places":2}"#);
        assert_eq!(serde_json::from_str::<Transformer>(&json).unwrap(), tf);

        let tf: Transformer =
            serde_json::from_str(r#"{"name":"phonetic_code","algorithm":"refined_soundex"}"#).unwrap();
        assert_eq!(
            tf,
            Transformer::PhoneticCode {
                algorithm: PhoneticCodeAlgorithm::RefinedSoundex
            }
        );
    }

    #[test]
    fn test_empty_value_handling_tags() {
        for (variant, tag) in [
            (EmptyValueHandling::Ignore, "\"ignore\""),
            (EmptyValueHandling::Skip, "\"skip\""),
            (EmptyValueHandling::Error, "\"error\""),
        ] {
            assert_eq!(serde_json::to_string(&variant).unwrap(), tag);
        }
    }

    #[test]
    fn test_validate_requires_transformers() {
        let req = TransformRequest {
            config: config(),
            attribute_transformers: vec![],
            global_transformers: GlobalTransformerConfig::default(),
            entities: vec![Entity::new("1")],
        };

        assert_eq!(req.validate(), Err(ValidationError::NoTransformers));
    }

    #[test]
    fn test_validate_requires_entities() {
        let req = TransformRequest {
            config: config(),
            attribute_transformers: vec![],
            global_transformers: GlobalTransformerConfig {
                before: vec![Transformer::Normalization],
                after: vec![],
            },
            entities: vec![],
        };

        assert_eq!(req.validate(), Err(ValidationError::NoEntities));
    }
}
