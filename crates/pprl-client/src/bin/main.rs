//! pprl binary: command line client for the PPRL service
//!
//! Usage:
//!   pprl [--base-url URL] transform --request req.json --entities entities.json --output out.json
//!   pprl [--base-url URL] mask      --request req.json --entities entities.json --output out.json
//!   pprl [--base-url URL] match     --request req.json --domain d.json --range r.json --output out.json
//!   pprl [--base-url URL] estimate  --request req.json --entities entities.json --output out.json
//!
//! Request files hold the request object without its entity collections;
//! those are read from separate JSON files and merged in. Entity batches
//! are submitted in bounded chunks with a progress bar.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::de::DeserializeOwned;
use serde::Serialize;

use pprl_client::{estimate_attribute_stats, PprlClient};
use pprl_model::{
    BitVectorEntity, Entity, MaskRequest, MaskResponse, MatchRequest, TransformRequest,
    TransformResponse,
};

#[derive(Parser)]
#[command(name = "pprl")]
#[command(about = "Client for the privacy-preserving record linkage service")]
struct Cli {
    /// Base URL of the PPRL service
    #[arg(long, default_value = "http://localhost:8000")]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Preprocess entities through the transform pipeline
    Transform {
        /// Transform request JSON, without the entities field
        #[arg(long)]
        request: PathBuf,
        /// JSON array of entities
        #[arg(long)]
        entities: PathBuf,
        /// Where to write the response JSON
        #[arg(long)]
        output: PathBuf,
        /// Entities per submitted batch
        #[arg(long, default_value_t = 100)]
        batch_size: usize,
    },
    /// Encode entities into bit vectors
    Mask {
        /// Mask request JSON, without the entities field
        #[arg(long)]
        request: PathBuf,
        /// JSON array of entities
        #[arg(long)]
        entities: PathBuf,
        /// Where to write the response JSON
        #[arg(long)]
        output: PathBuf,
        /// Entities per submitted batch
        #[arg(long, default_value_t = 100)]
        batch_size: usize,
    },
    /// Match two collections of encoded vectors
    Match {
        /// Match request JSON, without the domain and range fields
        #[arg(long)]
        request: PathBuf,
        /// JSON array of domain bit vector entities
        #[arg(long)]
        domain: PathBuf,
        /// JSON array of range bit vector entities
        #[arg(long)]
        range: PathBuf,
        /// Where to write the response JSON
        #[arg(long)]
        output: PathBuf,
    },
    /// Estimate per-attribute weighting statistics from a sample population
    Estimate {
        /// Transform request JSON describing the preprocessing, without entities
        #[arg(long)]
        request: PathBuf,
        /// JSON array of sample entities
        #[arg(long)]
        entities: PathBuf,
        /// Where to write the statistics JSON
        #[arg(long)]
        output: PathBuf,
        /// q-gram size used for the statistics
        #[arg(long, default_value_t = 2)]
        token_size: usize,
        /// Padding applied during tokenization
        #[arg(long, default_value = "_")]
        padding: String,
        /// Entities per submitted batch
        #[arg(long, default_value_t = 100)]
        batch_size: usize,
    },
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read `{}`", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse `{}`", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content).with_context(|| format!("failed to write `{}`", path.display()))
}

/// Read a request template and merge entity collections into it.
fn request_with<T: DeserializeOwned>(
    path: &Path,
    fields: &[(&str, serde_json::Value)],
) -> anyhow::Result<T> {
    let mut template: serde_json::Value = read_json(path)?;
    let object = template
        .as_object_mut()
        .with_context(|| format!("`{}` must contain a JSON object", path.display()))?;

    for (key, value) in fields {
        object.insert((*key).to_string(), value.clone());
    }

    serde_json::from_value(template)
        .with_context(|| format!("invalid request in `{}`", path.display()))
}

fn batch_progress(batches: usize) -> ProgressBar {
    ProgressBar::new(batches as u64).with_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} batches ({eta})")
            .expect("progress template is static"),
    )
}

async fn run_transform(
    client: &PprlClient,
    request: &Path,
    entities: &Path,
    output: &Path,
    batch_size: usize,
) -> anyhow::Result<()> {
    let entities: Vec<Entity> = read_json(entities)?;
    let batch_size = batch_size.max(1);

    let progress = batch_progress(entities.len().div_ceil(batch_size));
    let mut merged: Option<TransformResponse> = None;

    for batch in entities.chunks(batch_size) {
        let req: TransformRequest =
            request_with(request, &[("entities", serde_json::to_value(batch)?)])?;
        let response = client.transform(&req).await?;

        match &mut merged {
            None => merged = Some(response),
            Some(merged) => merged.entities.extend(response.entities),
        }
        progress.inc(1);
    }

    progress.finish_and_clear();
    let merged = merged.context("no entities to transform")?;
    tracing::info!(entities = merged.entities.len(), "transformed entities");

    write_json(output, &merged)
}

async fn run_mask(
    client: &PprlClient,
    request: &Path,
    entities: &Path,
    output: &Path,
    batch_size: usize,
) -> anyhow::Result<()> {
    let entities: Vec<Entity> = read_json(entities)?;
    let batch_size = batch_size.max(1);

    let progress = batch_progress(entities.len().div_ceil(batch_size));
    let mut merged: Option<MaskResponse> = None;

    for batch in entities.chunks(batch_size) {
        let req: MaskRequest =
            request_with(request, &[("entities", serde_json::to_value(batch)?)])?;
        let response = client.mask(&req).await?;

        match &mut merged {
            None => merged = Some(response),
            Some(merged) => merged.entities.extend(response.entities),
        }
        progress.inc(1);
    }

    progress.finish_and_clear();
    let merged = merged.context("no entities to mask")?;
    tracing::info!(entities = merged.entities.len(), "masked entities");

    write_json(output, &merged)
}

async fn run_match(
    client: &PprlClient,
    request: &Path,
    domain: &Path,
    range: &Path,
    output: &Path,
) -> anyhow::Result<()> {
    let domain: Vec<BitVectorEntity> = read_json(domain)?;
    let range: Vec<BitVectorEntity> = read_json(range)?;

    let req: MatchRequest = request_with(
        request,
        &[
            ("domain", serde_json::to_value(&domain)?),
            ("range", serde_json::to_value(&range)?),
        ],
    )?;

    let response = client.match_vectors(&req).await?;
    tracing::info!(matches = response.matches.len(), "matching finished");

    write_json(output, &response)
}

async fn run_estimate(
    client: &PprlClient,
    request: &Path,
    entities: &Path,
    output: &Path,
    token_size: usize,
    padding: &str,
    batch_size: usize,
) -> anyhow::Result<()> {
    let entities: Vec<Entity> = read_json(entities)?;

    // The template needs a syntactically complete request; entities are
    // replaced per batch during estimation.
    let template: TransformRequest =
        request_with(request, &[("entities", serde_json::Value::Array(vec![]))])?;

    let stats = estimate_attribute_stats(
        client, &template, &entities, token_size, padding, batch_size,
    )
    .await?;

    tracing::info!(attributes = stats.len(), "estimated attribute statistics");
    write_json(output, &stats)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let client = PprlClient::new(&cli.base_url);

    match &cli.command {
        Command::Transform {
            request,
            entities,
            output,
            batch_size,
        } => run_transform(&client, request, entities, output, *batch_size).await,
        Command::Mask {
            request,
            entities,
            output,
            batch_size,
        } => run_mask(&client, request, entities, output, *batch_size).await,
        Command::Match {
            request,
            domain,
            range,
            output,
        } => run_match(&client, request, domain, range, output).await,
        Command::Estimate {
            request,
            entities,
            output,
            token_size,
            padding,
            batch_size,
        } => {
            run_estimate(
                &client, request, entities, output, *token_size, padding, *batch_size,
            )
            .await
        }
    }
}
