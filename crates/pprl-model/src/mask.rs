//! Masking configuration: hash functions, filter layouts, hardeners

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::Entity;
use crate::error::ValidationError;

/// Cryptographic digest algorithms available for token hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    /// Digest output size in bytes.
    pub fn digest_size(&self) -> usize {
        match self {
            HashAlgorithm::Md5 => 16,
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha512 => 64,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Md5 => write!(f, "md5"),
            HashAlgorithm::Sha1 => write!(f, "sha1"),
            HashAlgorithm::Sha256 => write!(f, "sha256"),
            HashAlgorithm::Sha512 => write!(f, "sha512"),
        }
    }
}

/// Digest algorithm list plus optional key. A key switches every digest
/// into its HMAC form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HashFunction {
    pub algorithms: Vec<HashAlgorithm>,
    #[serde(default)]
    pub key: Option<String>,
}

/// Scheme for deriving `k` bit positions from a token's digest stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum HashStrategy {
    DoubleHash,
    EnhancedDoubleHash,
    TripleHash,
    RandomHash,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HashConfig {
    pub function: HashFunction,
    pub strategy: HashStrategy,
}

/// Filter family discriminator, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    Clk,
    Rbf,
    Clkrbf,
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterType::Clk => write!(f, "clk"),
            FilterType::Rbf => write!(f, "rbf"),
            FilterType::Clkrbf => write!(f, "clkrbf"),
        }
    }
}

/// Filter layout. CLK is a single uniform filter; RBF concatenates
/// per-attribute sub-filters and samples them down; CLK-RBF shares one
/// filter but scales `k` per attribute weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Filter {
    Clk {
        filter_size: usize,
        hash_values: u32,
    },
    Rbf {
        hash_values: u32,
        seed: u64,
    },
    Clkrbf {
        hash_values: u32,
    },
}

impl Filter {
    pub fn filter_type(&self) -> FilterType {
        match self {
            Filter::Clk { .. } => FilterType::Clk,
            Filter::Rbf { .. } => FilterType::Rbf,
            Filter::Clkrbf { .. } => FilterType::Clkrbf,
        }
    }

    /// Base amount of hash values per token.
    pub fn hash_values(&self) -> u32 {
        match self {
            Filter::Clk { hash_values, .. }
            | Filter::Rbf { hash_values, .. }
            | Filter::Clkrbf { hash_values } => *hash_values,
        }
    }
}

/// One element of the hardener chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum HardenerConfig {
    Balance,
    XorFold,
    Permute {
        seed: u64,
    },
    RandomizedResponse {
        seed: u64,
        probability: f64,
    },
    #[serde(rename = "rule_90")]
    Rule90,
    Rehash {
        window_size: usize,
        window_step: usize,
        samples: usize,
    },
}

/// Per-attribute salt source: either a literal value or the value of
/// another attribute on the same entity. Exactly one must be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeSalt {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub attribute: Option<String>,
}

impl AttributeSalt {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match (&self.value, &self.attribute) {
            (Some(_), Some(_)) => Err(ValidationError::SaltOverspecified),
            (None, None) => Err(ValidationError::SaltUnderspecified),
            _ => Ok(()),
        }
    }
}

/// Attribute configuration for uniform (CLK) filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticAttributeConfig {
    pub attribute_name: String,
    #[serde(default)]
    pub salt: Option<AttributeSalt>,
}

/// Attribute configuration for weighted (RBF / CLK-RBF) filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeightedAttributeConfig {
    pub attribute_name: String,
    #[serde(default)]
    pub salt: Option<AttributeSalt>,
    pub weight: f64,
    pub average_token_count: f64,
}

/// Either kind of attribute configuration. Requests must be homogeneous;
/// the weighted form is tried first since it carries more fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeConfig {
    Weighted(WeightedAttributeConfig),
    Static(StaticAttributeConfig),
}

impl AttributeConfig {
    pub fn attribute_name(&self) -> &str {
        match self {
            AttributeConfig::Weighted(c) => &c.attribute_name,
            AttributeConfig::Static(c) => &c.attribute_name,
        }
    }

    pub fn salt(&self) -> Option<&AttributeSalt> {
        match self {
            AttributeConfig::Weighted(c) => c.salt.as_ref(),
            AttributeConfig::Static(c) => c.salt.as_ref(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_padding() -> String {
    "_".into()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaskConfig {
    /// q-gram size.
    pub token_size: usize,
    pub hash: HashConfig,
    /// Prefix each token with its attribute name so identical grams from
    /// different attributes map to different positions.
    #[serde(default = "default_true")]
    pub prepend_attribute_name: bool,
    pub filter: Filter,
    #[serde(default = "default_padding")]
    pub padding: String,
    #[serde(default)]
    pub hardeners: Vec<HardenerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaskRequest {
    pub config: MaskConfig,
    #[serde(default)]
    pub attributes: Vec<AttributeConfig>,
    pub entities: Vec<Entity>,
}

impl MaskRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.entities.is_empty() {
            return Err(ValidationError::NoEntities);
        }

        self.validate_config()?;
        self.validate_attribute_kind()?;
        self.validate_attributes_present()?;
        self.validate_salts()?;

        Ok(())
    }

    fn validate_config(&self) -> Result<(), ValidationError> {
        let config = &self.config;

        if config.token_size < 2 {
            return Err(ValidationError::InvalidTokenSize(config.token_size));
        }

        if config.hash.function.algorithms.is_empty() {
            return Err(ValidationError::NoHashAlgorithms);
        }

        if config.filter.hash_values() == 0 {
            return Err(ValidationError::NonPositive {
                field: "hash_values",
                value: 0.0,
            });
        }

        if let Filter::Clk { filter_size, .. } = config.filter {
            if filter_size == 0 {
                return Err(ValidationError::NonPositive {
                    field: "filter_size",
                    value: 0.0,
                });
            }
        }

        for hardener in &config.hardeners {
            match *hardener {
                HardenerConfig::RandomizedResponse { probability, .. } => {
                    if !(0.0..=1.0).contains(&probability) {
                        return Err(ValidationError::InvalidProbability(probability));
                    }
                }
                HardenerConfig::Rehash {
                    window_size,
                    window_step,
                    samples,
                } => {
                    if window_size == 0 || window_size > 64 {
                        return Err(ValidationError::InvalidWindowSize(window_size));
                    }
                    if window_step == 0 {
                        return Err(ValidationError::NonPositive {
                            field: "window_step",
                            value: 0.0,
                        });
                    }
                    if samples == 0 {
                        return Err(ValidationError::NonPositive {
                            field: "samples",
                            value: 0.0,
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn validate_attribute_kind(&self) -> Result<(), ValidationError> {
        let filter_type = self.config.filter.filter_type();

        match filter_type {
            FilterType::Clk => {
                if self
                    .attributes
                    .iter()
                    .any(|a| matches!(a, AttributeConfig::Weighted(_)))
                {
                    return Err(ValidationError::StaticAttributesExpected {
                        filter: filter_type.to_string(),
                    });
                }
            }
            FilterType::Rbf | FilterType::Clkrbf => {
                let all_weighted = self
                    .attributes
                    .iter()
                    .all(|a| matches!(a, AttributeConfig::Weighted(_)));

                if self.attributes.is_empty() || !all_weighted {
                    return Err(ValidationError::WeightedAttributesExpected {
                        filter: filter_type.to_string(),
                    });
                }

                for attr in &self.attributes {
                    if let AttributeConfig::Weighted(w) = attr {
                        if w.weight <= 0.0 {
                            return Err(ValidationError::NonPositive {
                                field: "weight",
                                value: w.weight,
                            });
                        }
                        if w.average_token_count <= 0.0 {
                            return Err(ValidationError::NonPositive {
                                field: "average_token_count",
                                value: w.average_token_count,
                            });
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Collect entity IDs missing the given attribute, formatted for the
    /// error message.
    fn missing_on_entities(&self, attr_name: &str) -> Option<String> {
        let missing: Vec<&str> = self
            .entities
            .iter()
            .filter(|e| !e.attributes.contains_key(attr_name))
            .map(|e| e.id.as_str())
            .collect();

        if missing.is_empty() {
            None
        } else {
            Some(format!(
                "`{}` on entities with ID `{}`",
                attr_name,
                missing.join("`, `")
            ))
        }
    }

    fn validate_attributes_present(&self) -> Result<(), ValidationError> {
        let problems: Vec<String> = self
            .attributes
            .iter()
            .filter_map(|a| self.missing_on_entities(a.attribute_name()))
            .collect();

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::AttributesMissing(problems.join(", ")))
        }
    }

    fn validate_salts(&self) -> Result<(), ValidationError> {
        let mut problems = Vec::new();

        for attr in &self.attributes {
            let Some(salt) = attr.salt() else {
                continue;
            };
            salt.validate()?;

            if let Some(salt_attr) = &salt.attribute {
                if let Some(problem) = self.missing_on_entities(salt_attr) {
                    problems.push(problem);
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::SaltAttributesMissing(problems.join(", ")))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskResponse {
    pub config: MaskConfig,
    pub entities: Vec<crate::common::BitVectorEntity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clk_config(attributes: Vec<AttributeConfig>, entities: Vec<Entity>) -> MaskRequest {
        MaskRequest {
            config: MaskConfig {
                token_size: 2,
                hash: HashConfig {
                    function: HashFunction {
                        algorithms: vec![HashAlgorithm::Sha1],
                        key: None,
                    },
                    strategy: HashStrategy::DoubleHash,
                },
                prepend_attribute_name: true,
                filter: Filter::Clk {
                    filter_size: 512,
                    hash_values: 5,
                },
                padding: "_".into(),
                hardeners: vec![],
            },
            attributes,
            entities,
        }
    }

    #[test]
    fn test_filter_tags() {
        let filter = Filter::Clk {
            filter_size: 512,
            hash_values: 5,
        };
        let json = serde_json::to_string(&filter).unwrap();
        assert_eq!(json, r#"{"type":"clk","filter_size":512,"hash_values":5}"#);

        let filter: Filter = serde_json::from_str(r#"{"type":"rbf","hash_values":5,"seed":727}"#).unwrap();
        assert_eq!(
            filter,
            Filter::Rbf {
                hash_values: 5,
                seed: 727
            }
        );

        let filter: Filter = serde_json::from_str(r#"{"type":"clkrbf","hash_values":5}"#).unwrap();
        assert_eq!(filter.filter_type(), FilterType::Clkrbf);
    }

    #[test]
    fn test_hardener_tags() {
        let json = serde_json::to_string(&HardenerConfig::Rule90).unwrap();
        assert_eq!(json, r#"{"name":"rule_90"}"#);

        let json = serde_json::to_string(&HardenerConfig::XorFold).unwrap();
        assert_eq!(json, r#"{"name":"xor_fold"}"#);

        let hardener: HardenerConfig =
            serde_json::from_str(r#"{"name":"randomized_response","seed":3,"probability":0.25}"#).unwrap();
        assert_eq!(
            hardener,
            HardenerConfig::RandomizedResponse {
                seed: 3,
                probability: 0.25
            }
        );
    }

    #[test]
    fn test_attribute_config_untagged() {
        let attr: AttributeConfig = serde_json::from_str(
            r#"{"attribute_name":"first_name","weight":2.0,"average_token_count":6.0}"#,
        )
        .unwrap();
        assert!(matches!(attr, AttributeConfig::Weighted(_)));

        let attr: AttributeConfig = serde_json::from_str(r#"{"attribute_name":"first_name"}"#).unwrap();
        assert!(matches!(attr, AttributeConfig::Static(_)));
    }

    #[test]
    fn test_salt_exactly_one() {
        let salt = AttributeSalt {
            value: Some("pepper".into()),
            attribute: Some("last_name".into()),
        };
        assert_eq!(salt.validate(), Err(ValidationError::SaltOverspecified));

        let salt = AttributeSalt::default();
        assert_eq!(salt.validate(), Err(ValidationError::SaltUnderspecified));

        let salt = AttributeSalt {
            value: Some("pepper".into()),
            attribute: None,
        };
        assert!(salt.validate().is_ok());
    }

    #[test]
    fn test_clk_rejects_weighted_attributes() {
        let req = clk_config(
            vec![AttributeConfig::Weighted(WeightedAttributeConfig {
                attribute_name: "first_name".into(),
                salt: None,
                weight: 1.0,
                average_token_count: 5.0,
            })],
            vec![Entity::new("1").with_attribute("first_name", "jane")],
        );

        assert!(matches!(
            req.validate(),
            Err(ValidationError::StaticAttributesExpected { .. })
        ));
    }

    #[test]
    fn test_weighted_filter_requires_attributes() {
        let mut req = clk_config(vec![], vec![Entity::new("1").with_attribute("first_name", "jane")]);
        req.config.filter = Filter::Clkrbf { hash_values: 5 };

        assert!(matches!(
            req.validate(),
            Err(ValidationError::WeightedAttributesExpected { .. })
        ));
    }

    #[test]
    fn test_configured_attribute_must_exist() {
        let req = clk_config(
            vec![AttributeConfig::Static(StaticAttributeConfig {
                attribute_name: "last_name".into(),
                salt: None,
            })],
            vec![Entity::new("1").with_attribute("first_name", "jane")],
        );

        assert!(matches!(req.validate(), Err(ValidationError::AttributesMissing(_))));
    }

    #[test]
    fn test_salt_attribute_must_exist() {
        let req = clk_config(
            vec![AttributeConfig::Static(StaticAttributeConfig {
                attribute_name: "first_name".into(),
                salt: Some(AttributeSalt {
                    value: None,
                    attribute: Some("birth_date".into()),
                }),
            })],
            vec![Entity::new("1").with_attribute("first_name", "jane")],
        );

        assert!(matches!(
            req.validate(),
            Err(ValidationError::SaltAttributesMissing(_))
        ));
    }
}
