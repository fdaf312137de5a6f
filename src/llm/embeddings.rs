//! Embedding client for a text-embeddings-inference style endpoint.
//!
//! The endpoint accepts `{"inputs": "<text>"}` and answers with an array of
//! vectors; the first vector is the embedding for the input. Failures are
//! returned to the caller untouched and never retried here: search treats a
//! failure as "no vector", ingestion treats it as fatal for that document.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::EmbeddingConfig;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Persistent: no endpoint configured. Every attempt fails the same way.
    #[error("embedding endpoint is not configured (set EMBEDDING_API_URL)")]
    NotConfigured,

    #[error("failed to reach embedding service: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("embedding service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected embedding response: {0}")]
    Malformed(String),
}

impl EmbeddingError {
    /// True for failures that will not go away by trying again.
    pub fn is_persistent(&self) -> bool {
        matches!(self, EmbeddingError::NotConfigured)
    }

    /// Short cause class surfaced to API callers.
    pub fn cause(&self) -> &'static str {
        match self {
            EmbeddingError::NotConfigured => "not_configured",
            EmbeddingError::Transport(_) => "unreachable",
            EmbeddingError::Status { .. } => "upstream_status",
            EmbeddingError::Malformed(_) => "malformed_response",
        }
    }

    /// Log at a level matching how actionable the failure is.
    pub fn log(&self, context: &str) {
        if self.is_persistent() {
            tracing::error!(cause = self.cause(), "{context}: {self}");
        } else {
            tracing::warn!(cause = self.cause(), "{context}: {self}");
        }
    }
}

/// Turns text into a fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// HTTP embedder talking to a single `/embed` endpoint.
pub struct HttpEmbedder {
    client: reqwest::Client,
    api_url: Option<String>,
    dims: usize,
    timeout: Duration,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a str,
}

impl HttpEmbedder {
    pub fn new(client: reqwest::Client, config: &EmbeddingConfig) -> Self {
        Self {
            client,
            api_url: config.api_url.clone(),
            dims: config.dims,
            timeout: config.timeout(),
        }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = self.api_url.as_deref().ok_or(EmbeddingError::NotConfigured)?;

        let resp = self
            .client
            .post(url)
            .timeout(self.timeout)
            .json(&EmbedRequest { inputs: text })
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(EmbeddingError::Status { status, body });
        }

        let payload: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| EmbeddingError::Malformed(e.to_string()))?;

        parse_first_vector(&payload, self.dims)
    }
}

/// Take the first element of the response array as the embedding.
fn parse_first_vector(payload: &serde_json::Value, dims: usize) -> Result<Vec<f32>, EmbeddingError> {
    let first = payload
        .as_array()
        .and_then(|outer| outer.first())
        .ok_or_else(|| EmbeddingError::Malformed("expected a non-empty array".to_string()))?;

    let values = first
        .as_array()
        .ok_or_else(|| EmbeddingError::Malformed("first element is not an array".to_string()))?;

    let vector = values
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect::<Option<Vec<f32>>>()
        .ok_or_else(|| EmbeddingError::Malformed("vector contains non-numeric values".to_string()))?;

    if vector.len() != dims {
        return Err(EmbeddingError::Malformed(format!(
            "expected {dims} dimensions, got {}",
            vector.len()
        )));
    }

    Ok(vector)
}
