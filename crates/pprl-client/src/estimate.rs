//! Attribute statistics estimation over the service's transform endpoint
//!
//! The sample population is preprocessed remotely in bounded batches (the
//! same pipeline later used for masking), then the weighting statistics
//! are computed locally.

use std::collections::BTreeMap;

use indicatif::{ProgressBar, ProgressStyle};

use pprl_core::{attribute_stats, AttributeStats};
use pprl_model::{Entity, TransformRequest};

use crate::client::{PprlClient, Result};

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Transform `entities` through the service in batches of `batch_size`
/// and compute per-attribute statistics on the preprocessed values. The
/// `template` supplies the transform configuration; its own entity list
/// is ignored.
pub async fn estimate_attribute_stats(
    client: &PprlClient,
    template: &TransformRequest,
    entities: &[Entity],
    token_size: usize,
    padding: &str,
    batch_size: usize,
) -> Result<BTreeMap<String, AttributeStats>> {
    let batch_size = batch_size.max(1);
    let batches = entities.chunks(batch_size);

    let progress = ProgressBar::new(batches.len() as u64).with_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} batches ({eta})")
            .expect("progress template is static"),
    );

    let mut transformed = Vec::with_capacity(entities.len());

    for batch in batches {
        let req = TransformRequest {
            config: template.config,
            attribute_transformers: template.attribute_transformers.clone(),
            global_transformers: template.global_transformers.clone(),
            entities: batch.to_vec(),
        };

        let response = client.transform(&req).await?;
        transformed.extend(response.entities);
        progress.inc(1);
    }

    progress.finish_and_clear();

    Ok(attribute_stats(&transformed, token_size, padding))
}
