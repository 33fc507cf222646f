//! HTTP routes for the PPRL service

use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;

use pprl_model::{
    HealthResponse, MaskRequest, MaskResponse, MatchRequest, MatchResponse, TransformRequest,
    TransformResponse,
};

use crate::error::Result;

/// Health check endpoint
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Preprocess a batch of entities
async fn transform(Json(req): Json<TransformRequest>) -> Result<Json<TransformResponse>> {
    let response = pprl_core::transform(&req)?;

    tracing::debug!(
        entities = req.entities.len(),
        transformed = response.entities.len(),
        "transformed entity batch"
    );

    Ok(Json(response))
}

/// Encode a batch of entities into bit vectors
async fn mask(Json(req): Json<MaskRequest>) -> Result<Json<MaskResponse>> {
    let response = pprl_core::mask(&req)?;

    tracing::debug!(
        entities = response.entities.len(),
        filter = %req.config.filter.filter_type(),
        "masked entity batch"
    );

    Ok(Json(response))
}

/// Compare two collections of bit vectors
async fn match_vectors(Json(req): Json<MatchRequest>) -> Result<Json<MatchResponse>> {
    let response = pprl_core::match_vectors(&req)?;

    tracing::debug!(
        domain = req.domain.len(),
        range = req.range.len(),
        matches = response.matches.len(),
        "matched vector collections"
    );

    Ok(Json(response))
}

/// Create the router with all routes
pub fn create_router() -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/transform", post(transform))
        .route("/mask", post(mask))
        .route("/match", post(match_vectors))
}
