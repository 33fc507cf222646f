//! Error types for the PPRL engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Structural configuration error, detected before processing.
    #[error("invalid request: {0}")]
    Validation(#[from] pprl_model::ValidationError),

    /// A value violated a transform's contract.
    #[error("entity with ID `{entity_id}` could not be processed: {message}")]
    Transform { entity_id: String, message: String },

    /// An empty attribute value under the `error` policy.
    #[error("entity with ID `{entity_id}` contains empty field")]
    EmptyValue { entity_id: String },

    /// Malformed base64 on an input bit vector.
    #[error("invalid base64 encoded bit vectors on entities with IDs {0}")]
    Decode(String),

    /// Bit vectors of differing lengths in one matching request.
    #[error("bit vector length mismatch: expected {expected} bits, entity `{entity_id}` has {actual}")]
    LengthMismatch {
        entity_id: String,
        expected: usize,
        actual: usize,
    },

    /// An out-of-domain numeric parameter.
    #[error("{0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, Error>;
