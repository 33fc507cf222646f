//! Masking engine: tokenize entity attributes, hash tokens into bit
//! positions, assemble filters, apply the hardener chain.
//!
//! Three filter layouts share the same token insertion path and differ in
//! how filters are sized and combined:
//!
//! - CLK: one filter, one `k` for every attribute
//! - CLK-RBF: one filter, per-attribute `k` scaled by weight
//! - RBF: per-attribute sub-filters, concatenated and sampled down by a
//!   seeded permutation
//!
//! Masking is deterministic: for a fixed configuration, entity and key,
//! the output vector is byte-identical across runs and hosts.

use std::collections::BTreeMap;

use pprl_model::{
    AttributeConfig, AttributeSalt, BitVectorEntity, Entity, Filter, MaskConfig, MaskRequest,
    MaskResponse, WeightedAttributeConfig,
};

use crate::bits::{optimal_size, BitVector};
use crate::error::Result;
use crate::harden;
use crate::hashing::{bit_positions, TokenHasher};
use crate::rng;
use crate::tokens::tokenize;

/// Mask a batch of entities. The request is validated once; entities are
/// then processed independently.
pub fn mask(req: &MaskRequest) -> Result<MaskResponse> {
    req.validate()?;

    let hasher = TokenHasher::new(&req.config.hash.function);

    let vectors = match req.config.filter {
        Filter::Clk {
            filter_size,
            hash_values,
        } => mask_clk(req, &hasher, filter_size, hash_values),
        Filter::Clkrbf { hash_values } => mask_clkrbf(req, &hasher, hash_values)?,
        Filter::Rbf { hash_values, seed } => mask_rbf(req, &hasher, hash_values, seed)?,
    };

    let entities = req
        .entities
        .iter()
        .zip(vectors)
        .map(|(entity, vector)| {
            let hardened = harden::apply_chain(&req.config.hardeners, vector);
            BitVectorEntity::new(entity.id.clone(), hardened.to_base64())
        })
        .collect();

    Ok(MaskResponse {
        config: req.config.clone(),
        entities,
    })
}

/// The salt prepended to every token of an attribute: a literal, or the
/// value of another attribute on the same entity. Presence of the source
/// attribute is checked during validation.
fn resolve_salt<'a>(entity: &'a Entity, salt: Option<&'a AttributeSalt>) -> &'a str {
    let Some(salt) = salt else {
        return "";
    };

    if let Some(value) = &salt.value {
        value
    } else if let Some(attribute) = &salt.attribute {
        entity
            .attributes
            .get(attribute)
            .map(String::as_str)
            .unwrap_or_default()
    } else {
        ""
    }
}

/// Tokenize one attribute value and set the resulting positions.
fn insert_tokens(
    vector: &mut BitVector,
    config: &MaskConfig,
    hasher: &TokenHasher,
    hash_values: u32,
    attribute_name: &str,
    value: &str,
    salt: &str,
) {
    let filter_size = vector.len();

    for gram in tokenize(value, config.token_size, &config.padding) {
        let token = if config.prepend_attribute_name {
            format!("{salt}{attribute_name}:{gram}")
        } else {
            format!("{salt}{gram}")
        };

        let stream = hasher.digest_stream(token.as_bytes());
        for position in bit_positions(config.hash.strategy, hash_values, &stream, filter_size) {
            vector.set(position);
        }
    }
}

/// Uniform filter: every attribute of the entity goes into one filter
/// with the shared `k`.
fn mask_clk(
    req: &MaskRequest,
    hasher: &TokenHasher,
    filter_size: usize,
    hash_values: u32,
) -> Vec<BitVector> {
    let salts: BTreeMap<&str, Option<&AttributeSalt>> = req
        .attributes
        .iter()
        .map(|a| (a.attribute_name(), a.salt()))
        .collect();

    req.entities
        .iter()
        .map(|entity| {
            let mut vector = BitVector::new(filter_size);

            for (name, value) in &entity.attributes {
                let salt = resolve_salt(entity, salts.get(name.as_str()).copied().flatten());
                insert_tokens(&mut vector, &req.config, hasher, hash_values, name, value, salt);
            }

            vector
        })
        .collect()
}

/// A weighted attribute with its effective hash value count.
struct WeightedAttribute<'a> {
    config: &'a WeightedAttributeConfig,
    hash_values: u32,
}

impl WeightedAttribute<'_> {
    /// Expected number of bit-set operations this attribute contributes.
    fn insertion_load(&self) -> f64 {
        self.hash_values as f64 * self.config.average_token_count
    }
}

/// Scale the base `k` by each attribute's weight relative to the lightest
/// one: `k_a = ceil(k · w_a / min_w)`. Sorted by attribute name so filter
/// layouts are identical across hosts regardless of configuration order.
fn weighted_attributes(attributes: &[AttributeConfig], base_hash_values: u32) -> Vec<WeightedAttribute<'_>> {
    let mut weighted: Vec<&WeightedAttributeConfig> = attributes
        .iter()
        .filter_map(|a| match a {
            AttributeConfig::Weighted(w) => Some(w),
            AttributeConfig::Static(_) => None,
        })
        .collect();
    weighted.sort_by(|a, b| a.attribute_name.cmp(&b.attribute_name));

    let min_weight = weighted
        .iter()
        .map(|w| w.weight)
        .fold(f64::INFINITY, f64::min);

    weighted
        .into_iter()
        .map(|config| WeightedAttribute {
            config,
            hash_values: (base_hash_values as f64 * config.weight / min_weight).ceil() as u32,
        })
        .collect()
}

/// Weighted single filter: shared filter sized for 50% density under the
/// combined insertion load; heavier attributes set more bits per token.
/// Only configured attributes are inserted.
fn mask_clkrbf(req: &MaskRequest, hasher: &TokenHasher, hash_values: u32) -> Result<Vec<BitVector>> {
    let attributes = weighted_attributes(&req.attributes, hash_values);
    let total_load: f64 = attributes.iter().map(WeightedAttribute::insertion_load).sum();
    let filter_size = optimal_size(0.5, total_load)?;

    let vectors = req
        .entities
        .iter()
        .map(|entity| {
            let mut vector = BitVector::new(filter_size);

            for attribute in &attributes {
                let name = &attribute.config.attribute_name;
                let value = entity.attributes.get(name).map(String::as_str).unwrap_or_default();
                let salt = resolve_salt(entity, attribute.config.salt.as_ref());

                insert_tokens(
                    &mut vector,
                    &req.config,
                    hasher,
                    attribute.hash_values,
                    name,
                    value,
                    salt,
                );
            }

            vector
        })
        .collect();

    Ok(vectors)
}

/// Record-level filter: per-attribute sub-filters are built independently,
/// concatenated in attribute-name order, and reduced to `output_size` bits
/// at positions given by a seeded Fisher-Yates permutation. The
/// permutation is generated once per job, so every entity shares the same
/// bit layout.
fn mask_rbf(req: &MaskRequest, hasher: &TokenHasher, hash_values: u32, seed: u64) -> Result<Vec<BitVector>> {
    let attributes = weighted_attributes(&req.attributes, hash_values);

    let mut sub_sizes = Vec::with_capacity(attributes.len());
    for attribute in &attributes {
        sub_sizes.push(optimal_size(0.5, attribute.insertion_load())?);
    }

    let total_size: usize = sub_sizes.iter().sum();
    let total_load: f64 = attributes.iter().map(WeightedAttribute::insertion_load).sum();
    let output_size = optimal_size(0.5, total_load)?;
    assert!(
        output_size <= total_size,
        "sampled output exceeds the concatenated sub-filters"
    );

    let permutation = rng::shuffled_indices(total_size, &mut rng::seeded(seed));
    let sampled = &permutation[..output_size];

    let vectors = req
        .entities
        .iter()
        .map(|entity| {
            let mut combined = BitVector::new(total_size);
            let mut offset = 0;

            for (attribute, &sub_size) in attributes.iter().zip(&sub_sizes) {
                let name = &attribute.config.attribute_name;
                let value = entity.attributes.get(name).map(String::as_str).unwrap_or_default();
                let salt = resolve_salt(entity, attribute.config.salt.as_ref());

                let mut sub_filter = BitVector::new(sub_size);
                insert_tokens(
                    &mut sub_filter,
                    &req.config,
                    hasher,
                    attribute.hash_values,
                    name,
                    value,
                    salt,
                );

                for i in 0..sub_size {
                    if sub_filter.test(i) {
                        combined.set(offset + i);
                    }
                }
                offset += sub_size;
            }

            let mut out = BitVector::new(output_size);
            for (i, &source) in sampled.iter().enumerate() {
                if combined.test(source) {
                    out.set(i);
                }
            }

            out
        })
        .collect();

    Ok(vectors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pprl_model::{
        HashAlgorithm, HashConfig, HashFunction, HashStrategy, StaticAttributeConfig,
    };

    fn entity() -> Entity {
        Entity::new("1")
            .with_attribute("first_name", "jane")
            .with_attribute("last_name", "meier")
    }

    fn clk_request(entities: Vec<Entity>) -> MaskRequest {
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
            attributes: vec![],
            entities,
        }
    }

    fn weighted(name: &str, weight: f64, average_token_count: f64) -> AttributeConfig {
        AttributeConfig::Weighted(WeightedAttributeConfig {
            attribute_name: name.into(),
            salt: None,
            weight,
            average_token_count,
        })
    }

    fn decoded(response: &MaskResponse, i: usize) -> BitVector {
        BitVector::from_base64(&response.entities[i].value).unwrap()
    }

    #[test]
    fn test_clk_is_deterministic() {
        let req = clk_request(vec![entity()]);

        let first = mask(&req).unwrap();
        let second = mask(&req).unwrap();

        assert_eq!(first.entities[0].value, second.entities[0].value);
    }

    #[test]
    fn test_identical_entities_yield_identical_vectors() {
        let mut other = entity();
        other.id = "2".into();

        let response = mask(&clk_request(vec![entity(), other])).unwrap();
        assert_eq!(response.entities[0].value, response.entities[1].value);
        assert_eq!(response.entities[0].id, "1");
        assert_eq!(response.entities[1].id, "2");
    }

    #[test]
    fn test_clk_vector_has_configured_size() {
        let response = mask(&clk_request(vec![entity()])).unwrap();
        assert_eq!(decoded(&response, 0).len(), 512);
    }

    #[test]
    fn test_attribute_prefix_separates_identical_values() {
        let same_values = Entity::new("1")
            .with_attribute("first_name", "jane")
            .with_attribute("last_name", "jane");
        let req = clk_request(vec![same_values.clone()]);
        let prefixed = mask(&req).unwrap();

        let mut unprefixed_req = clk_request(vec![same_values]);
        unprefixed_req.config.prepend_attribute_name = false;

        let unprefixed = mask(&unprefixed_req).unwrap();

        // With prefixes both attributes insert distinct tokens; without,
        // the two identical values collapse onto the same positions.
        assert!(decoded(&prefixed, 0).count_ones() > decoded(&unprefixed, 0).count_ones());
    }

    #[test]
    fn test_key_changes_vectors() {
        let unkeyed = mask(&clk_request(vec![entity()])).unwrap();

        let mut keyed_req = clk_request(vec![entity()]);
        keyed_req.config.hash.function.key = Some("secret".into());
        let keyed = mask(&keyed_req).unwrap();

        assert_ne!(unkeyed.entities[0].value, keyed.entities[0].value);
    }

    #[test]
    fn test_literal_salt_changes_vector() {
        let mut req = clk_request(vec![entity()]);
        req.attributes = vec![AttributeConfig::Static(StaticAttributeConfig {
            attribute_name: "first_name".into(),
            salt: Some(AttributeSalt {
                value: Some("pepper".into()),
                attribute: None,
            }),
        })];

        let salted = mask(&req).unwrap();
        let unsalted = mask(&clk_request(vec![entity()])).unwrap();

        assert_ne!(salted.entities[0].value, unsalted.entities[0].value);
    }

    #[test]
    fn test_attribute_salt_draws_from_entity() {
        let make_request = |salt_value: &str| {
            let e = Entity::new("1")
                .with_attribute("first_name", "jane")
                .with_attribute("year_of_birth", salt_value);
            let mut req = clk_request(vec![e]);
            req.attributes = vec![AttributeConfig::Static(StaticAttributeConfig {
                attribute_name: "first_name".into(),
                salt: Some(AttributeSalt {
                    value: None,
                    attribute: Some("year_of_birth".into()),
                }),
            })];
            req
        };

        let born_1984 = mask(&make_request("1984")).unwrap();
        let born_1985 = mask(&make_request("1985")).unwrap();

        assert_ne!(born_1984.entities[0].value, born_1985.entities[0].value);
    }

    #[test]
    fn test_clkrbf_filter_is_sized_from_insertion_load() {
        let mut req = clk_request(vec![entity()]);
        req.config.filter = Filter::Clkrbf { hash_values: 5 };
        req.attributes = vec![
            weighted("first_name", 2.0, 5.0),
            weighted("last_name", 1.0, 6.0),
        ];

        // k(last_name) = 5, k(first_name) = 10; load = 10*5 + 5*6 = 80.
        let expected_size = optimal_size(0.5, 80.0).unwrap();

        let response = mask(&req).unwrap();
        let vector = decoded(&response, 0);

        assert_eq!(vector.len(), expected_size.div_ceil(8) * 8);
        assert!(vector.count_ones() > 0);
    }

    #[test]
    fn test_clkrbf_ignores_unconfigured_attributes() {
        let mut req = clk_request(vec![entity()]);
        req.config.filter = Filter::Clkrbf { hash_values: 5 };
        req.attributes = vec![weighted("first_name", 1.0, 5.0)];

        let base = mask(&req).unwrap();

        let mut changed_unconfigured = req.clone();
        changed_unconfigured.entities[0]
            .attributes
            .insert("last_name".into(), "someone else".into());
        let changed = mask(&changed_unconfigured).unwrap();

        assert_eq!(base.entities[0].value, changed.entities[0].value);
    }

    #[test]
    fn test_rbf_output_size_and_determinism() {
        let mut req = clk_request(vec![entity()]);
        req.config.filter = Filter::Rbf {
            hash_values: 5,
            seed: 727,
        };
        req.attributes = vec![
            weighted("first_name", 2.0, 5.0),
            weighted("last_name", 1.0, 6.0),
        ];

        let expected_size = optimal_size(0.5, 80.0).unwrap();

        let first = mask(&req).unwrap();
        let second = mask(&req).unwrap();

        assert_eq!(first.entities[0].value, second.entities[0].value);
        assert_eq!(decoded(&first, 0).len(), expected_size.div_ceil(8) * 8);
    }

    #[test]
    fn test_rbf_seed_changes_sampling() {
        let mut req = clk_request(vec![entity()]);
        req.config.filter = Filter::Rbf {
            hash_values: 5,
            seed: 727,
        };
        req.attributes = vec![
            weighted("first_name", 2.0, 5.0),
            weighted("last_name", 1.0, 6.0),
        ];

        let first = mask(&req).unwrap();

        req.config.filter = Filter::Rbf {
            hash_values: 5,
            seed: 728,
        };
        let reseeded = mask(&req).unwrap();

        assert_ne!(first.entities[0].value, reseeded.entities[0].value);
    }

    #[test]
    fn test_hardener_chain_runs_after_masking() {
        let mut req = clk_request(vec![entity()]);
        req.config.hardeners = vec![pprl_model::HardenerConfig::Balance];

        let response = mask(&req).unwrap();
        let vector = decoded(&response, 0);

        assert_eq!(vector.len(), 1024);
        assert_eq!(vector.count_ones(), 512);
    }

    #[test]
    fn test_validation_runs_before_masking() {
        let mut req = clk_request(vec![entity()]);
        req.attributes = vec![weighted("first_name", 1.0, 5.0)];

        assert!(mask(&req).is_err());
    }
}
