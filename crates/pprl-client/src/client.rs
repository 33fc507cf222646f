//! HTTP client for the PPRL service

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use pprl_model::{
    MaskRequest, MaskResponse, MatchRequest, MatchResponse, TransformRequest, TransformResponse,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum ClientError {
    /// The service rejected the request's content (HTTP 400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request failed validation (HTTP 422).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Any other non-success status.
    #[error("unexpected status code {status}: `{body}`")]
    UnexpectedStatus { status: StatusCode, body: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Client for one PPRL service instance.
#[derive(Debug, Clone)]
pub struct PprlClient {
    http: reqwest::Client,
    base_url: String,
}

impl PprlClient {
    /// Create a client with the default request timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client configuration is static");

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        path: &str,
        req: &Req,
    ) -> Result<Resp> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .json(req)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::BAD_REQUEST => ClientError::BadRequest(body),
            StatusCode::UNPROCESSABLE_ENTITY => ClientError::InvalidRequest(body),
            status => ClientError::UnexpectedStatus { status, body },
        })
    }

    /// Preprocess a batch of entities.
    pub async fn transform(&self, req: &TransformRequest) -> Result<TransformResponse> {
        self.post("/transform", req).await
    }

    /// Encode a batch of entities into bit vectors.
    pub async fn mask(&self, req: &MaskRequest) -> Result<MaskResponse> {
        self.post("/mask", req).await
    }

    /// Compare two collections of encoded vectors.
    pub async fn match_vectors(&self, req: &MatchRequest) -> Result<MatchResponse> {
        self.post("/match", req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client = PprlClient::new("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
    }
}
