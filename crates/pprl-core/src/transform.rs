//! Value transforms and the entity preprocessing pipeline
//!
//! For every attribute the global *before* transforms run first, then the
//! attribute's own transform list, then the global *after* transforms.
//! The empty-value policy decides what happens to values that are empty
//! once the *before* stage has run.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use pprl_model::{
    EmptyValueHandling, Entity, TransformRequest, TransformResponse, Transformer,
};

use crate::error::{Error, Result};
use crate::phonetics;

/// ASCII punctuation, the default character filter set.
const PUNCTUATION: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// A value that violated a transform's contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("value `{0}` is not a number")]
    NotANumber(String),

    #[error("value `{value}` does not match date format `{format}`")]
    DateMismatch { value: String, format: String },

    #[error("invalid date format `{0}`")]
    DateFormat(String),

    #[error("value `{0}` has no mapping, or no default value is present")]
    MappingMiss(String),
}

/// Apply a single transform to a value.
pub fn apply(transformer: &Transformer, value: &str) -> std::result::Result<String, TransformError> {
    match transformer {
        Transformer::Normalization => Ok(normalize(value)),
        Transformer::CharacterFilter { characters } => {
            Ok(character_filter(characters.as_deref().unwrap_or(PUNCTUATION), value))
        }
        Transformer::Mapping {
            mapping,
            default_value,
            inline,
        } => {
            if *inline {
                Ok(inline_mapping(mapping, value))
            } else {
                mapping
                    .get(value)
                    .cloned()
                    .or_else(|| default_value.clone())
                    .ok_or_else(|| TransformError::MappingMiss(value.into()))
            }
        }
        Transformer::Number { decimal_places } => number(*decimal_places, value),
        Transformer::DateTime {
            input_format,
            output_format,
        } => date_time(input_format, output_format, value),
        Transformer::PhoneticCode { algorithm } => Ok(phonetics::encode(*algorithm, value)),
    }
}

/// NFKD decomposition, diacritics stripped, lowercased, whitespace runs
/// collapsed to single spaces, ends trimmed. Idempotent.
fn normalize(value: &str) -> String {
    let stripped: String = value
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn character_filter(characters: &str, value: &str) -> String {
    value.chars().filter(|c| !characters.contains(*c)).collect()
}

/// Replace occurrences of mapping keys in a single left-to-right scan.
/// At each position the longest matching key wins; replacement output is
/// never rescanned.
fn inline_mapping(mapping: &BTreeMap<String, String>, value: &str) -> String {
    let mut keys: Vec<(&String, &String)> = mapping.iter().collect();
    keys.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));

    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    'scan: while !rest.is_empty() {
        for (key, replacement) in &keys {
            if !key.is_empty() && rest.starts_with(key.as_str()) {
                out.push_str(replacement);
                rest = &rest[key.len()..];
                continue 'scan;
            }
        }

        let c = rest.chars().next().expect("scan loop runs on non-empty input");
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }

    out
}

fn number(decimal_places: usize, value: &str) -> std::result::Result<String, TransformError> {
    let parsed: f64 = value
        .trim()
        .parse()
        .map_err(|_| TransformError::NotANumber(value.into()))?;

    Ok(format!("{parsed:.decimal_places$}"))
}

fn date_time(
    input_format: &str,
    output_format: &str,
    value: &str,
) -> std::result::Result<String, TransformError> {
    let parsed = NaiveDateTime::parse_from_str(value, input_format)
        .or_else(|_| {
            NaiveDate::parse_from_str(value, input_format).map(|d| d.and_time(NaiveTime::MIN))
        })
        .or_else(|_| {
            NaiveTime::parse_from_str(value, input_format).map(|t| {
                NaiveDate::from_ymd_opt(1900, 1, 1)
                    .expect("1900-01-01 is a valid date")
                    .and_time(t)
            })
        })
        .map_err(|_| TransformError::DateMismatch {
            value: value.into(),
            format: input_format.into(),
        })?;

    let mut out = String::new();
    write!(out, "{}", parsed.format(output_format))
        .map_err(|_| TransformError::DateFormat(output_format.into()))?;

    Ok(out)
}

/// Run the full preprocessing pipeline over a batch of entities.
pub fn transform(req: &TransformRequest) -> Result<TransformResponse> {
    req.validate()?;

    let per_attribute: BTreeMap<&str, &[Transformer]> = req
        .attribute_transformers
        .iter()
        .map(|a| (a.attribute_name.as_str(), a.transformers.as_slice()))
        .collect();

    let mut entities = Vec::with_capacity(req.entities.len());

    for entity in &req.entities {
        match transform_entity(entity, req, &per_attribute) {
            Ok(transformed) => entities.push(transformed),
            Err(e) if req.config.drop_failed_entities => {
                tracing::warn!(entity_id = %entity.id, error = %e, "dropping failed entity");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(TransformResponse {
        config: req.config,
        entities,
    })
}

fn transform_entity(
    entity: &Entity,
    req: &TransformRequest,
    per_attribute: &BTreeMap<&str, &[Transformer]>,
) -> Result<Entity> {
    let mut out = Entity::new(entity.id.clone());

    for (name, value) in &entity.attributes {
        let mut value = value.clone();

        for tf in &req.global_transformers.before {
            value = apply_for_entity(tf, &value, &entity.id)?;
        }

        if value.is_empty() {
            match req.config.empty_value {
                EmptyValueHandling::Error => {
                    return Err(Error::EmptyValue {
                        entity_id: entity.id.clone(),
                    })
                }
                EmptyValueHandling::Skip => continue,
                EmptyValueHandling::Ignore => {}
            }
        }

        if let Some(transformers) = per_attribute.get(name.as_str()) {
            for tf in *transformers {
                value = apply_for_entity(tf, &value, &entity.id)?;
            }
        }

        for tf in &req.global_transformers.after {
            value = apply_for_entity(tf, &value, &entity.id)?;
        }

        out.attributes.insert(name.clone(), value);
    }

    Ok(out)
}

fn apply_for_entity(transformer: &Transformer, value: &str, entity_id: &str) -> Result<String> {
    apply(transformer, value).map_err(|e| Error::Transform {
        entity_id: entity_id.into(),
        message: e.to_string(),
    })
}
