//! pprl-service: HTTP wrapper around the PPRL engine
//!
//! A thin, stateless layer: every endpoint deserializes a request from
//! `pprl-model`, calls the corresponding core operation, and serializes
//! the result. All processing state lives inside a single request.

pub mod error;
pub mod routes;

pub use error::ServiceError;
pub use routes::create_router;
