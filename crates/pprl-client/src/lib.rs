//! pprl-client: client library and CLI for the PPRL service
//!
//! [`PprlClient`] posts the `pprl-model` request types to a running
//! service and returns the typed responses. [`estimate_attribute_stats`]
//! feeds a sample population through the service's transform endpoint in
//! bounded batches and derives per-attribute weighting statistics from
//! the result.

pub mod client;
pub mod estimate;

pub use client::{ClientError, PprlClient};
pub use estimate::estimate_attribute_stats;
