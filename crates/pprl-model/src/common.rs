//! Entity types shared by every operation

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A record to be encoded: an opaque identifier plus named attribute values.
///
/// Attribute order is irrelevant to the engine; a sorted map keeps
/// serialization stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Entity {
    pub id: String,
    pub attributes: BTreeMap<String, String>,
}

impl Entity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute insertion, mostly for tests and examples.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// A masked record: the identifier plus the base64 encoded bit vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BitVectorEntity {
    pub id: String,
    /// Standard base64 of the packed bit vector bytes.
    pub value: String,
}

impl BitVectorEntity {
    pub fn new(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
        }
    }
}

/// Health check response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
        }
    }
}
